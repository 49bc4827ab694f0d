//! Device-authorization handshake: request a code, show it, poll until done.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use super::device_code::{DeviceAuthorization, DeviceCodePoll, DeviceCodeSession, DeviceFlowState};
use super::error::AuthError;
use super::transport::DeviceAuthTransport;

const MIN_INTERVAL_SECS: u64 = 1;

/// Tunables for the polling loop.
#[derive(Debug, Clone)]
pub struct DeviceFlowOptions {
    /// Added to the interval on every slow-down signal.
    pub slow_down_increment: Duration,
    /// Upper bound for slow-down growth.
    pub max_poll_interval: Duration,
    /// Consecutive transport failures tolerated before giving up.
    pub max_transient_failures: u32,
}

impl Default for DeviceFlowOptions {
    fn default() -> Self {
        Self {
            slow_down_increment: Duration::from_secs(5),
            max_poll_interval: Duration::from_secs(60),
            max_transient_failures: 10,
        }
    }
}

/// Presents the verification URI and user code to the person at the keyboard.
pub trait DevicePrompt: Send + Sync {
    fn show(&self, session: &DeviceCodeSession);
}

/// Writes instructions to stderr so stdout stays clean for the credential.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrPrompt;

impl DevicePrompt for StderrPrompt {
    fn show(&self, session: &DeviceCodeSession) {
        eprintln!("To authorize this device, visit: {}", session.verification_uri);
        eprintln!("and enter the code: {}", session.user_code);
        eprintln!(
            "Waiting for authorization (code expires in {} minutes)...",
            session.expires_in_secs.div_ceil(60)
        );
    }
}

/// Runs the device-code flow against a [`DeviceAuthTransport`].
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use keyfetch::auth::{DeviceFlowClient, HttpDeviceAuthTransport};
///
/// # async fn example() -> Result<(), keyfetch::auth::AuthError> {
/// let transport = HttpDeviceAuthTransport::new("https://api.keyfetch.dev")?;
/// let client = DeviceFlowClient::new(Arc::new(transport));
/// let authorization = client.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct DeviceFlowClient {
    transport: Arc<dyn DeviceAuthTransport>,
    prompt: Arc<dyn DevicePrompt>,
    options: DeviceFlowOptions,
}

impl DeviceFlowClient {
    pub fn new(transport: Arc<dyn DeviceAuthTransport>) -> Self {
        Self {
            transport,
            prompt: Arc::new(StderrPrompt),
            options: DeviceFlowOptions::default(),
        }
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn DevicePrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_options(mut self, options: DeviceFlowOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the whole handshake and return the issued credential.
    pub async fn run(&self) -> Result<DeviceAuthorization, AuthError> {
        let session = self.start().await?;
        self.prompt.show(&session);
        self.wait_for_authorization(&session).await
    }

    /// Request a device code. Any failure here is final.
    pub async fn start(&self) -> Result<DeviceCodeSession, AuthError> {
        tracing::debug!(state = %DeviceFlowState::Requesting, "requesting device code");
        let grant = self.transport.request_device_code().await?;
        let session = DeviceCodeSession::start(
            grant.device_code,
            grant.user_code,
            grant.verification_uri,
            grant.interval.max(MIN_INTERVAL_SECS),
            grant.expires_in,
        )?;
        tracing::debug!(
            state = %DeviceFlowState::AwaitingAuthorization,
            interval_secs = session.interval_secs,
            expires_in_secs = session.expires_in_secs,
            "device code issued"
        );
        Ok(session)
    }

    /// Poll until the session completes, is refused, or reaches its deadline.
    ///
    /// Every poll is preceded by a full interval of sleep, and nothing is
    /// sent at or after the deadline.
    pub async fn wait_for_authorization(
        &self,
        session: &DeviceCodeSession,
    ) -> Result<DeviceAuthorization, AuthError> {
        let mut interval = Duration::from_secs(session.interval_secs);
        let mut transient_failures = 0u32;

        loop {
            let remaining = session.remaining();
            if interval >= remaining {
                sleep(remaining).await;
                return Err(expired());
            }
            sleep(interval).await;

            let poll = tokio::time::timeout(
                session.remaining(),
                self.transport.poll(&session.device_code),
            )
            .await;
            let Ok(poll) = poll else {
                return Err(expired());
            };

            match poll {
                Ok(DeviceCodePoll::Pending) => {
                    transient_failures = 0;
                }
                Ok(DeviceCodePoll::SlowDown) => {
                    transient_failures = 0;
                    interval = self.slowed_interval(interval);
                    tracing::debug!(interval_secs = interval.as_secs(), "server asked to slow down");
                }
                Ok(DeviceCodePoll::Authorized(authorization)) => {
                    tracing::info!(
                        state = %DeviceFlowState::Complete,
                        identity = authorization.identity_label.as_deref().unwrap_or("-"),
                        "device authorized"
                    );
                    return Ok(authorization);
                }
                Ok(DeviceCodePoll::Denied { reason }) => {
                    tracing::debug!(state = %DeviceFlowState::Error, %reason, "authorization refused");
                    return Err(AuthError::AuthorizationDenied { reason });
                }
                Ok(DeviceCodePoll::Expired) => return Err(expired()),
                Err(AuthError::Network(message)) => {
                    transient_failures += 1;
                    tracing::warn!(
                        attempt = transient_failures,
                        max_attempts = self.options.max_transient_failures,
                        error = %message,
                        "device poll failed, will retry"
                    );
                    if transient_failures >= self.options.max_transient_failures {
                        return Err(AuthError::Network(format!(
                            "giving up after {transient_failures} failed polls: {message}"
                        )));
                    }
                }
                Err(other) => return Err(other),
            }
        }
    }

    fn slowed_interval(&self, current: Duration) -> Duration {
        let next = current + self.options.slow_down_increment;
        if current >= self.options.max_poll_interval {
            current
        } else {
            next.min(self.options.max_poll_interval)
        }
    }
}

fn expired() -> AuthError {
    tracing::debug!(state = %DeviceFlowState::Expired, "device code expired");
    AuthError::AuthorizationExpired
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverCalled;

    #[async_trait::async_trait]
    impl DeviceAuthTransport for NeverCalled {
        async fn request_device_code(
            &self,
        ) -> Result<super::super::transport::DeviceCodeGrant, AuthError> {
            unreachable!("transport must not be used")
        }

        async fn poll(&self, _device_code: &str) -> Result<DeviceCodePoll, AuthError> {
            unreachable!("transport must not be used")
        }
    }

    fn client(options: DeviceFlowOptions) -> DeviceFlowClient {
        DeviceFlowClient::new(Arc::new(NeverCalled)).with_options(options)
    }

    #[test]
    fn slow_down_adds_increment_until_cap() {
        let client = client(DeviceFlowOptions {
            slow_down_increment: Duration::from_secs(5),
            max_poll_interval: Duration::from_secs(12),
            max_transient_failures: 3,
        });
        assert_eq!(client.slowed_interval(Duration::from_secs(5)), Duration::from_secs(10));
        assert_eq!(client.slowed_interval(Duration::from_secs(10)), Duration::from_secs(12));
        assert_eq!(client.slowed_interval(Duration::from_secs(12)), Duration::from_secs(12));
    }

    #[test]
    fn server_interval_above_cap_is_kept() {
        let client = client(DeviceFlowOptions {
            max_poll_interval: Duration::from_secs(10),
            ..DeviceFlowOptions::default()
        });
        assert_eq!(client.slowed_interval(Duration::from_secs(30)), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn session_shorter_than_interval_expires_without_polling() {
        let client = client(DeviceFlowOptions::default());
        let session =
            DeviceCodeSession::start("d1", "ABCD-1234", "https://x/activate", 10, 5).unwrap();
        let started = tokio::time::Instant::now();
        let result = client.wait_for_authorization(&session).await;
        assert!(matches!(result, Err(AuthError::AuthorizationExpired)));
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }
}
