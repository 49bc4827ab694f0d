//! Error types for keyfetch.

use thiserror::Error;

use crate::auth::AuthError;

/// Top-level error for library consumers and the CLI.
#[derive(Error, Debug)]
pub enum KeyfetchError {
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl KeyfetchError {
    /// Single terminal message: the error plus any recovery guidance.
    pub fn user_message(&self) -> String {
        let Self::Auth(err) = self;
        match err.recovery_hint() {
            Some(hint) => format!("{err}. {hint}"),
            None => err.to_string(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, KeyfetchError>;
