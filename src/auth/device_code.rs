use std::time::Duration;

use chrono::{DateTime, Utc};
use strum::Display;
use tokio::time::Instant;

use super::error::AuthError;
use super::record::CredentialRecord;

/// Device-code session details for one authorization attempt.
///
/// Lives only in memory for the duration of a single flow.
#[derive(Clone)]
pub struct DeviceCodeSession {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub interval_secs: u64,
    pub expires_in_secs: u64,
    pub started_at: DateTime<Utc>,
    pub deadline: Instant,
}

impl DeviceCodeSession {
    /// Start a session now; the deadline is `expires_in_secs` from this instant.
    ///
    /// Fails with a protocol error when the lifetime cannot be represented
    /// as a deadline.
    pub fn start(
        device_code: impl Into<String>,
        user_code: impl Into<String>,
        verification_uri: impl Into<String>,
        interval_secs: u64,
        expires_in_secs: u64,
    ) -> Result<Self, AuthError> {
        let deadline = Instant::now()
            .checked_add(Duration::from_secs(expires_in_secs))
            .ok_or_else(|| {
                AuthError::Protocol(format!(
                    "Device code lifetime out of range: expires_in={expires_in_secs}"
                ))
            })?;
        Ok(Self {
            device_code: device_code.into(),
            user_code: user_code.into(),
            verification_uri: verification_uri.into(),
            interval_secs,
            expires_in_secs,
            started_at: Utc::now(),
            deadline,
        })
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

impl std::fmt::Debug for DeviceCodeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCodeSession")
            .field("device_code", &"<redacted>")
            .field("user_code", &self.user_code)
            .field("verification_uri", &self.verification_uri)
            .field("interval_secs", &self.interval_secs)
            .field("expires_in_secs", &self.expires_in_secs)
            .field("started_at", &self.started_at)
            .finish()
    }
}

/// Outcome of a single poll against the token endpoint.
#[derive(Debug, Clone)]
pub enum DeviceCodePoll {
    Pending,
    SlowDown,
    Authorized(DeviceAuthorization),
    Denied { reason: String },
    Expired,
}

/// Credential and identity returned by a completed device flow.
#[derive(Clone)]
pub struct DeviceAuthorization {
    pub credential: String,
    pub identity_label: Option<String>,
    pub subject_id: Option<String>,
}

impl DeviceAuthorization {
    pub fn into_record(self) -> CredentialRecord {
        CredentialRecord {
            credential: self.credential,
            identity_label: self.identity_label,
            subject_id: self.subject_id,
            cached_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for DeviceAuthorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceAuthorization")
            .field("credential", &"<redacted>")
            .field("identity_label", &self.identity_label)
            .field("subject_id", &self.subject_id)
            .finish()
    }
}

/// States of the device-authorization handshake, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceFlowState {
    Requesting,
    AwaitingAuthorization,
    Complete,
    Error,
    Expired,
}
