use thiserror::Error;

/// Errors produced while resolving a credential or running the device flow.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },
    #[error("Authorization expired before it was approved")]
    AuthorizationExpired,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Failed to write credential cache: {0}")]
    CacheWrite(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AuthError {
    /// Whether this error ends a resolution attempt.
    ///
    /// Cache write failures are reported but never stop the caller from
    /// using a credential it already holds.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::CacheWrite(_))
    }

    /// Actionable guidance to print after the error message, if any.
    pub fn recovery_hint(&self) -> Option<&'static str> {
        match self {
            Self::AuthorizationDenied { .. } => {
                Some("Authorization was refused. Run `keyfetch auth login` to start over.")
            }
            Self::AuthorizationExpired => {
                Some("The device code expired. Run `keyfetch auth login` to request a new one.")
            }
            Self::NotLoggedIn => Some("Run `keyfetch auth login` or set KEYFETCH_API_KEY."),
            Self::Protocol(_) => Some("Check KEYFETCH_BASE_URL points at the authorization server."),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
