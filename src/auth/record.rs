use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable cached credential plus optional identity metadata.
///
/// # Example
/// ```no_run
/// use keyfetch::auth::CredentialRecord;
///
/// let record = CredentialRecord::new("key_123")
///     .with_identity_label("alice")
///     .with_subject_id("user-42");
/// assert_eq!(record.credential, "key_123");
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub credential: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    pub cached_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            identity_label: None,
            subject_id: None,
            cached_at: Utc::now(),
        }
    }

    pub fn with_identity_label(mut self, label: impl Into<String>) -> Self {
        self.identity_label = Some(label.into());
        self
    }

    pub fn with_subject_id(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    /// A record is usable only when it carries a non-blank credential.
    pub fn is_complete(&self) -> bool {
        !self.credential.trim().is_empty()
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("credential", &"<redacted>")
            .field("identity_label", &self.identity_label)
            .field("subject_id", &self.subject_id)
            .field("cached_at", &self.cached_at)
            .finish()
    }
}
