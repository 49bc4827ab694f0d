//! Priority chain of credential sources.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use strum::Display;

use super::cache::CredentialStore;
use super::device_flow::DeviceFlowClient;
use super::error::AuthError;

/// Where a resolved credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CredentialSourceKind {
    Explicit,
    Cache,
    DeviceFlow,
}

/// A usable credential and the source that produced it.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub credential: String,
    pub source: CredentialSourceKind,
}

impl std::fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("credential", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// One link of the resolution chain.
///
/// `Ok(None)` passes resolution on to the next source; an error stops the
/// chain.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    fn kind(&self) -> CredentialSourceKind;
    async fn fetch(&self) -> Result<Option<String>, AuthError>;
}

/// Override supplied from outside, e.g. `KEYFETCH_API_KEY`.
#[derive(Debug, Clone, Default)]
pub struct ExplicitSource {
    value: Option<String>,
}

impl ExplicitSource {
    pub fn new(value: Option<String>) -> Self {
        Self {
            value: value.filter(|v| !v.trim().is_empty()),
        }
    }
}

#[async_trait]
impl CredentialSource for ExplicitSource {
    fn kind(&self) -> CredentialSourceKind {
        CredentialSourceKind::Explicit
    }

    async fn fetch(&self) -> Result<Option<String>, AuthError> {
        Ok(self.value.clone())
    }
}

/// Previously persisted credential.
pub struct CacheSource {
    store: Arc<dyn CredentialStore>,
}

impl CacheSource {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CredentialSource for CacheSource {
    fn kind(&self) -> CredentialSourceKind {
        CredentialSourceKind::Cache
    }

    async fn fetch(&self) -> Result<Option<String>, AuthError> {
        Ok(self.store.load().map(|record| record.credential))
    }
}

/// Interactive device flow; persists what it obtains.
pub struct DeviceFlowSource {
    client: Arc<DeviceFlowClient>,
    store: Arc<dyn CredentialStore>,
}

impl DeviceFlowSource {
    pub fn new(client: Arc<DeviceFlowClient>, store: Arc<dyn CredentialStore>) -> Self {
        Self { client, store }
    }
}

#[async_trait]
impl CredentialSource for DeviceFlowSource {
    fn kind(&self) -> CredentialSourceKind {
        CredentialSourceKind::DeviceFlow
    }

    async fn fetch(&self) -> Result<Option<String>, AuthError> {
        let record = self.client.run().await?.into_record();
        persist(self.store.as_ref(), &record);
        Ok(Some(record.credential))
    }
}

/// Save a freshly issued record; failure is only a warning because the
/// credential is still good for this process.
pub(crate) fn persist(store: &dyn CredentialStore, record: &super::CredentialRecord) -> bool {
    match store.save(record) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "credential obtained but could not be cached");
            false
        }
    }
}

/// Tries each source in order and returns the first hit.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use keyfetch::auth::{CacheSource, CredentialResolver, ExplicitSource, FileCredentialCache};
///
/// # async fn example() -> Result<(), keyfetch::auth::AuthError> {
/// let cache = Arc::new(FileCredentialCache::new_default());
/// let resolver = CredentialResolver::new()
///     .with_source(ExplicitSource::new(std::env::var("KEYFETCH_API_KEY").ok()))
///     .with_source(CacheSource::new(cache));
/// let resolved = resolver.resolve().await?;
/// println!("using credential from {}", resolved.source);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct CredentialResolver {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl CredentialResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard chain: explicit override, cache, then device flow when
    /// one is given.
    pub fn standard(
        explicit: Option<String>,
        store: Arc<dyn CredentialStore>,
        device_flow: Option<Arc<DeviceFlowClient>>,
    ) -> Self {
        let resolver = Self::new()
            .with_source(ExplicitSource::new(explicit))
            .with_source(CacheSource::new(store.clone()));
        match device_flow {
            Some(client) => resolver.with_source(DeviceFlowSource::new(client, store)),
            None => resolver,
        }
    }

    pub fn with_source(mut self, source: impl CredentialSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn source_kinds(&self) -> Vec<CredentialSourceKind> {
        self.sources.iter().map(|source| source.kind()).collect()
    }

    pub async fn resolve(&self) -> Result<ResolvedCredential, AuthError> {
        for source in &self.sources {
            if let Some(credential) = source.fetch().await? {
                tracing::debug!(source = %source.kind(), "credential resolved");
                return Ok(ResolvedCredential {
                    credential,
                    source: source.kind(),
                });
            }
        }
        Err(AuthError::NotLoggedIn)
    }
}
