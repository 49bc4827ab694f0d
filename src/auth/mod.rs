//! Credential resolution, device-code authorization and the credential cache.

pub mod cache;
pub mod device_code;
pub mod device_flow;
pub mod error;
pub mod record;
pub mod resolver;
pub mod service;
pub mod transport;

pub use cache::{CacheConfig, CredentialStore, FileCredentialCache};
pub use device_code::{DeviceAuthorization, DeviceCodePoll, DeviceCodeSession, DeviceFlowState};
pub use device_flow::{DeviceFlowClient, DeviceFlowOptions, DevicePrompt, StderrPrompt};
pub use error::AuthError;
pub use record::CredentialRecord;
pub use resolver::{
    CacheSource, CredentialResolver, CredentialSource, CredentialSourceKind, DeviceFlowSource,
    ExplicitSource, ResolvedCredential,
};
pub use service::{AuthService, AuthStatus, LoginOutcome};
pub use transport::{DeviceAuthTransport, DeviceCodeGrant, HttpDeviceAuthTransport};
