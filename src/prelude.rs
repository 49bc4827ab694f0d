//! Convenience re-exports for common use.

pub use crate::auth::{
    AuthError, AuthService, CredentialRecord, CredentialResolver, CredentialSourceKind,
    CredentialStore, DeviceFlowClient, FileCredentialCache, ResolvedCredential,
};
pub use crate::config::KeyfetchConfig;
pub use crate::error::{KeyfetchError, Result};
