//! HTTP exchange with the authorization server's device-code endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::device_code::{DeviceAuthorization, DeviceCodePoll};
use super::error::AuthError;

const DEVICE_CODE_PATH: &str = "/auth/device";
const DEVICE_POLL_PATH: &str = "/auth/device/poll";
const DEFAULT_INTERVAL_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Device-code grant as issued by the authorization server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceCodeGrant {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
}

/// Transport used by [`super::DeviceFlowClient`] to talk to the server.
///
/// `request_device_code` failures of any kind are protocol errors. For
/// `poll`, `AuthError::Network` marks a transient failure the caller may
/// retry; every other error is final.
#[async_trait]
pub trait DeviceAuthTransport: Send + Sync {
    async fn request_device_code(&self) -> Result<DeviceCodeGrant, AuthError>;
    async fn poll(&self, device_code: &str) -> Result<DeviceCodePoll, AuthError>;
}

/// `reqwest`-backed transport.
///
/// # Example
/// ```no_run
/// use keyfetch::auth::HttpDeviceAuthTransport;
///
/// let transport = HttpDeviceAuthTransport::new("https://api.keyfetch.dev")?;
/// # Ok::<(), keyfetch::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HttpDeviceAuthTransport {
    client: reqwest::Client,
    device_code_url: String,
    poll_url: String,
}

impl HttpDeviceAuthTransport {
    pub fn new(base_url: &str) -> Result<Self, AuthError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("keyfetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| AuthError::Configuration(err.to_string()))?;
        let base = base_url.trim_end_matches('/');
        Ok(Self {
            client,
            device_code_url: format!("{base}{DEVICE_CODE_PATH}"),
            poll_url: format!("{base}{DEVICE_POLL_PATH}"),
        })
    }
}

#[async_trait]
impl DeviceAuthTransport for HttpDeviceAuthTransport {
    async fn request_device_code(&self) -> Result<DeviceCodeGrant, AuthError> {
        let resp = self
            .client
            .post(&self.device_code_url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|err| AuthError::Protocol(format!("Device code request failed: {err}")))?;
        if !resp.status().is_success() {
            return Err(AuthError::Protocol(format!(
                "Device code request failed with status {}",
                resp.status()
            )));
        }
        let grant: DeviceCodeGrant = resp.json().await.map_err(|err| {
            AuthError::Protocol(format!("Device code response malformed: {err}"))
        })?;
        validate_grant(&grant)?;
        Ok(grant)
    }

    async fn poll(&self, device_code: &str) -> Result<DeviceCodePoll, AuthError> {
        let resp = self
            .client
            .post(&self.poll_url)
            .header("Accept", "application/json")
            .json(&PollRequest { device_code })
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(DeviceCodePoll::SlowDown);
        }
        if status.is_server_error() {
            return Err(AuthError::Network(format!(
                "Device poll failed with status {status}"
            )));
        }
        let body = resp.bytes().await?;
        match serde_json::from_slice::<PollResponse>(&body) {
            Ok(payload) => interpret_poll(payload),
            Err(_) if !status.is_success() => Err(AuthError::Network(format!(
                "Device poll failed with status {status}"
            ))),
            Err(err) => Err(AuthError::Network(format!(
                "Device poll response unreadable: {err}"
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct PollRequest<'a> {
    device_code: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct PollResponse {
    status: Option<String>,
    credential: Option<String>,
    identity_label: Option<String>,
    subject_id: Option<String>,
    error: Option<String>,
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn validate_grant(grant: &DeviceCodeGrant) -> Result<(), AuthError> {
    if grant.device_code.trim().is_empty() || grant.user_code.trim().is_empty() {
        return Err(AuthError::Protocol(
            "Device code response missing device_code or user_code".to_string(),
        ));
    }
    if grant.verification_uri.trim().is_empty() {
        return Err(AuthError::Protocol(
            "Device code response missing verification_uri".to_string(),
        ));
    }
    if grant.expires_in == 0 {
        return Err(AuthError::Protocol(
            "Device code response has zero expires_in".to_string(),
        ));
    }
    Ok(())
}

fn interpret_poll(payload: PollResponse) -> Result<DeviceCodePoll, AuthError> {
    match payload.status.as_deref() {
        Some("complete") => {
            let credential = payload
                .credential
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| {
                    AuthError::Protocol("Device poll completed without a credential".to_string())
                })?;
            Ok(DeviceCodePoll::Authorized(DeviceAuthorization {
                credential,
                identity_label: payload.identity_label,
                subject_id: payload.subject_id,
            }))
        }
        Some("pending") => Ok(DeviceCodePoll::Pending),
        Some("slow_down") => Ok(DeviceCodePoll::SlowDown),
        Some("expired") => Ok(DeviceCodePoll::Expired),
        Some("error") | None => match payload.error {
            Some(error) => Ok(interpret_error_code(error)),
            None if payload.status.is_some() => Ok(DeviceCodePoll::Denied {
                reason: "access_denied".to_string(),
            }),
            None => Err(AuthError::Network(
                "Device poll response missing status".to_string(),
            )),
        },
        Some(other) => Err(AuthError::Protocol(format!(
            "Device poll returned unknown status: {other}"
        ))),
    }
}

/// RFC 8628 error codes, for servers that report them in `error`.
fn interpret_error_code(error: String) -> DeviceCodePoll {
    match error.as_str() {
        "authorization_pending" => DeviceCodePoll::Pending,
        "slow_down" => DeviceCodePoll::SlowDown,
        "expired_token" => DeviceCodePoll::Expired,
        _ => DeviceCodePoll::Denied { reason: error },
    }
}
