#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use keyfetch::auth::{
    AuthError, CredentialRecord, CredentialStore, DeviceAuthTransport, DeviceAuthorization,
    DeviceCodeGrant, DeviceCodePoll, DeviceCodeSession, DeviceFlowClient, DevicePrompt,
};
use tokio::time::Instant;

type PollReply = Box<dyn Fn() -> Result<DeviceCodePoll, AuthError> + Send + Sync>;

#[derive(Default)]
pub struct InMemoryCredentialStore {
    record: Mutex<Option<CredentialRecord>>,
    fail_saves: bool,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_saves() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    pub fn seed(&self, record: CredentialRecord) {
        *self.record.lock().expect("store lock poisoned") = Some(record);
    }

    pub fn get(&self) -> Option<CredentialRecord> {
        self.record.lock().expect("store lock poisoned").clone()
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn load(&self) -> Option<CredentialRecord> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.get()
    }

    fn save(&self, record: &CredentialRecord) -> Result<(), AuthError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves {
            return Err(AuthError::CacheWrite("permission denied".to_string()));
        }
        *self.record.lock().expect("store lock poisoned") = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.record.lock().expect("store lock poisoned") = None;
        Ok(())
    }
}

/// Transport that replays queued replies and records when it was called.
pub struct ScriptedTransport {
    grant: Mutex<Option<Result<DeviceCodeGrant, AuthError>>>,
    polls: Mutex<VecDeque<Result<DeviceCodePoll, AuthError>>>,
    otherwise: PollReply,
    code_requests: AtomicUsize,
    poll_times: Mutex<Vec<Instant>>,
}

impl ScriptedTransport {
    pub fn new(grant: DeviceCodeGrant) -> Self {
        Self::with_grant_result(Ok(grant))
    }

    pub fn with_grant_result(grant: Result<DeviceCodeGrant, AuthError>) -> Self {
        Self {
            grant: Mutex::new(Some(grant)),
            polls: Mutex::new(VecDeque::new()),
            otherwise: Box::new(|| Ok(DeviceCodePoll::Pending)),
            code_requests: AtomicUsize::new(0),
            poll_times: Mutex::new(Vec::new()),
        }
    }

    pub fn then_poll(self, reply: Result<DeviceCodePoll, AuthError>) -> Self {
        self.polls.lock().expect("poll lock poisoned").push_back(reply);
        self
    }

    pub fn then_polls(self, count: usize, reply: DeviceCodePoll) -> Self {
        for _ in 0..count {
            self.polls
                .lock()
                .expect("poll lock poisoned")
                .push_back(Ok(reply.clone()));
        }
        self
    }

    /// Reply used once the queue is drained.
    pub fn otherwise(
        mut self,
        reply: impl Fn() -> Result<DeviceCodePoll, AuthError> + Send + Sync + 'static,
    ) -> Self {
        self.otherwise = Box::new(reply);
        self
    }

    pub fn code_requests(&self) -> usize {
        self.code_requests.load(Ordering::SeqCst)
    }

    pub fn poll_times(&self) -> Vec<Instant> {
        self.poll_times.lock().expect("poll lock poisoned").clone()
    }

    pub fn poll_count(&self) -> usize {
        self.poll_times().len()
    }
}

#[async_trait]
impl DeviceAuthTransport for ScriptedTransport {
    async fn request_device_code(&self) -> Result<DeviceCodeGrant, AuthError> {
        self.code_requests.fetch_add(1, Ordering::SeqCst);
        self.grant
            .lock()
            .expect("grant lock poisoned")
            .take()
            .unwrap_or_else(|| Err(AuthError::Protocol("grant already used".to_string())))
    }

    async fn poll(&self, _device_code: &str) -> Result<DeviceCodePoll, AuthError> {
        self.poll_times
            .lock()
            .expect("poll lock poisoned")
            .push(Instant::now());
        let queued = self.polls.lock().expect("poll lock poisoned").pop_front();
        queued.unwrap_or_else(|| (self.otherwise)())
    }
}

/// Transport whose polls never get an answer.
pub struct StalledTransport {
    grant: DeviceCodeGrant,
    polls: AtomicUsize,
}

impl StalledTransport {
    pub fn new(grant: DeviceCodeGrant) -> Self {
        Self {
            grant,
            polls: AtomicUsize::new(0),
        }
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceAuthTransport for StalledTransport {
    async fn request_device_code(&self) -> Result<DeviceCodeGrant, AuthError> {
        Ok(self.grant.clone())
    }

    async fn poll(&self, _device_code: &str) -> Result<DeviceCodePoll, AuthError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// Prompt that remembers what it was asked to show.
#[derive(Default)]
pub struct RecordingPrompt {
    shown: Mutex<Vec<(String, String)>>,
}

impl RecordingPrompt {
    pub fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().expect("prompt lock poisoned").clone()
    }
}

impl DevicePrompt for RecordingPrompt {
    fn show(&self, session: &DeviceCodeSession) {
        self.shown
            .lock()
            .expect("prompt lock poisoned")
            .push((session.verification_uri.clone(), session.user_code.clone()));
    }
}

pub fn grant(expires_in: u64, interval: u64) -> DeviceCodeGrant {
    DeviceCodeGrant {
        device_code: "d1".to_string(),
        user_code: "ABCD-1234".to_string(),
        verification_uri: "https://x/activate".to_string(),
        expires_in,
        interval,
    }
}

pub fn authorized(credential: &str, identity_label: Option<&str>) -> DeviceCodePoll {
    DeviceCodePoll::Authorized(DeviceAuthorization {
        credential: credential.to_string(),
        identity_label: identity_label.map(String::from),
        subject_id: None,
    })
}

pub fn flow_client(
    transport: Arc<ScriptedTransport>,
    prompt: Arc<RecordingPrompt>,
) -> DeviceFlowClient {
    DeviceFlowClient::new(transport).with_prompt(prompt)
}
