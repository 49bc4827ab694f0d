//! Configuration (layered: code > env > config file > defaults).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::auth::{AuthError, CacheConfig, DeviceFlowOptions};

pub const API_KEY_ENV: &str = "KEYFETCH_API_KEY";
pub const BASE_URL_ENV: &str = "KEYFETCH_BASE_URL";
pub const CONFIG_DIR_ENV: &str = "KEYFETCH_CONFIG_DIR";

const DEFAULT_BASE_URL: &str = "https://api.keyfetch.dev";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolved settings for the credential subsystem.
#[derive(Clone)]
pub struct KeyfetchConfig {
    /// Explicit credential override; wins over every other source.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Directory holding `credentials.json` and `config.toml`.
    pub config_dir: PathBuf,
    pub request_timeout: Duration,
    pub device_flow: DeviceFlowOptions,
}

impl fmt::Debug for KeyfetchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyfetchConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("config_dir", &self.config_dir)
            .field("request_timeout", &self.request_timeout)
            .field("device_flow", &self.device_flow)
            .finish()
    }
}

impl Default for KeyfetchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            config_dir: CacheConfig::default_dir(),
            request_timeout: Duration::from_secs(30),
            device_flow: DeviceFlowOptions::default(),
        }
    }
}

impl KeyfetchConfig {
    /// Load from the process environment (and `.env` if present), then the
    /// optional `config.toml` in the config directory.
    pub fn from_env() -> Result<Self, AuthError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] but reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        let mut config = Self::default();
        if let Some(dir) = non_blank(lookup(CONFIG_DIR_ENV)) {
            config.config_dir = PathBuf::from(dir);
        }

        let file_path = config.config_dir.join(CONFIG_FILE_NAME);
        if let Some(file) = ConfigFile::load(&file_path)? {
            config.apply_file(file);
        }

        if let Some(url) = non_blank(lookup(BASE_URL_ENV)) {
            config.base_url = url;
        }
        config.api_key = non_blank(lookup(API_KEY_ENV));
        Ok(config)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(self.config_dir.clone())
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(url) = non_blank(file.base_url) {
            self.base_url = url;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.max_poll_interval_secs {
            self.device_flow.max_poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = file.slow_down_increment_secs {
            self.device_flow.slow_down_increment = Duration::from_secs(secs);
        }
        if let Some(max) = file.max_transient_failures {
            self.device_flow.max_transient_failures = max.max(1);
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    max_poll_interval_secs: Option<u64>,
    slow_down_increment_secs: Option<u64>,
    max_transient_failures: Option<u32>,
}

impl ConfigFile {
    fn load(path: &Path) -> Result<Option<Self>, AuthError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Io(err.to_string())),
        };
        let file = toml::from_str(&raw).map_err(|err| {
            AuthError::Configuration(format!("{}: {err}", path.display()))
        })?;
        Ok(Some(file))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
