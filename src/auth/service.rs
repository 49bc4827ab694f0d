use std::sync::Arc;

use crate::config::KeyfetchConfig;

use super::cache::{CredentialStore, FileCredentialCache};
use super::device_flow::DeviceFlowClient;
use super::error::AuthError;
use super::record::CredentialRecord;
use super::resolver::{persist, CredentialResolver, ResolvedCredential};
use super::transport::HttpDeviceAuthTransport;

/// Result of an explicit `login`.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub record: CredentialRecord,
    /// False when the credential could not be written to the cache.
    pub cached: bool,
}

/// Snapshot of what `resolve` would find without touching the network.
#[derive(Debug, Clone)]
pub struct AuthStatus {
    pub explicit_override: bool,
    pub cached: Option<CredentialRecord>,
}

/// Service facade wiring configuration, cache and device flow together.
///
/// All terminal I/O other than the device prompt belongs to the caller.
///
/// # Example
/// ```no_run
/// use keyfetch::auth::AuthService;
/// use keyfetch::config::KeyfetchConfig;
///
/// # async fn example() -> Result<(), keyfetch::auth::AuthError> {
/// let service = AuthService::from_config(&KeyfetchConfig::from_env()?)?;
/// let resolved = service.resolve().await?;
/// eprintln!("credential source: {}", resolved.source);
/// # Ok(())
/// # }
/// ```
pub struct AuthService {
    explicit: Option<String>,
    store: Arc<dyn CredentialStore>,
    device_flow: Arc<DeviceFlowClient>,
}

impl AuthService {
    pub fn new(
        explicit: Option<String>,
        store: Arc<dyn CredentialStore>,
        device_flow: Arc<DeviceFlowClient>,
    ) -> Self {
        Self {
            explicit,
            store,
            device_flow,
        }
    }

    pub fn from_config(config: &KeyfetchConfig) -> Result<Self, AuthError> {
        let transport =
            HttpDeviceAuthTransport::with_timeout(&config.base_url, config.request_timeout)?;
        let device_flow = DeviceFlowClient::new(Arc::new(transport))
            .with_options(config.device_flow.clone());
        let store = FileCredentialCache::new(config.cache_config());
        Ok(Self::new(
            config.api_key.clone(),
            Arc::new(store),
            Arc::new(device_flow),
        ))
    }

    /// The resolution chain; `interactive = false` leaves out the device flow.
    pub fn resolver(&self, interactive: bool) -> CredentialResolver {
        let device_flow = interactive.then(|| self.device_flow.clone());
        CredentialResolver::standard(self.explicit.clone(), self.store.clone(), device_flow)
    }

    pub async fn resolve(&self) -> Result<ResolvedCredential, AuthError> {
        self.resolver(true).resolve().await
    }

    /// Run the device flow regardless of existing credentials and cache it.
    pub async fn login(&self) -> Result<LoginOutcome, AuthError> {
        let record = self.device_flow.run().await?.into_record();
        let cached = persist(self.store.as_ref(), &record);
        Ok(LoginOutcome { record, cached })
    }

    pub fn status(&self) -> AuthStatus {
        AuthStatus {
            explicit_override: self.explicit.as_deref().is_some_and(|v| !v.trim().is_empty()),
            cached: self.store.load(),
        }
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        self.store.clear()
    }
}
