use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::record::CredentialRecord;

const CACHE_FILE_NAME: &str = "credentials.json";
const CACHE_FILE_VERSION: u32 = 1;

/// Storage abstraction for the single cached credential record.
///
/// `load` never fails: anything that prevents a complete record from being
/// read is reported as `None`.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Option<CredentialRecord>;
    fn save(&self, record: &CredentialRecord) -> Result<(), AuthError>;
    fn clear(&self) -> Result<(), AuthError>;
}

/// Configuration for the file-backed credential cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub dir: PathBuf,
}

impl CacheConfig {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn default_dir() -> PathBuf {
        default_config_dir()
    }
}

/// Credential cache backed by one JSON file in the user's config directory.
///
/// # Example
/// ```no_run
/// use keyfetch::auth::{CredentialRecord, CredentialStore, FileCredentialCache};
///
/// let cache = FileCredentialCache::new_default();
/// cache.save(&CredentialRecord::new("key_123"))?;
/// assert!(cache.load().is_some());
/// # Ok::<(), keyfetch::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialCache {
    path: PathBuf,
}

impl FileCredentialCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            path: config.dir.join(CACHE_FILE_NAME),
        }
    }

    pub fn new_default() -> Self {
        Self::new(CacheConfig::new(default_config_dir()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_record(&self) -> Result<CredentialRecord, String> {
        let raw = fs::read_to_string(&self.path).map_err(|err| err.to_string())?;
        let file: CacheFile = serde_json::from_str(&raw).map_err(|err| err.to_string())?;
        if file.version != CACHE_FILE_VERSION {
            return Err(format!("unsupported cache version {}", file.version));
        }
        if !file.record.is_complete() {
            return Err("cached credential is blank".to_string());
        }
        Ok(file.record)
    }
}

impl CredentialStore for FileCredentialCache {
    fn load(&self) -> Option<CredentialRecord> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no cached credential");
            return None;
        }
        match self.read_record() {
            Ok(record) => Some(record),
            Err(reason) => {
                tracing::debug!(
                    path = %self.path.display(),
                    %reason,
                    "ignoring unusable credential cache"
                );
                None
            }
        }
    }

    fn save(&self, record: &CredentialRecord) -> Result<(), AuthError> {
        if !record.is_complete() {
            return Err(AuthError::CacheWrite(
                "refusing to cache a blank credential".to_string(),
            ));
        }
        let file = CacheFile {
            version: CACHE_FILE_VERSION,
            record: record.clone(),
        };
        let serialized =
            serde_json::to_vec_pretty(&file).map_err(|err| AuthError::CacheWrite(err.to_string()))?;
        atomic_write(&self.path, &serialized)
            .map_err(|err| AuthError::CacheWrite(format!("{}: {err}", self.path.display())))?;
        tracing::debug!(path = %self.path.display(), "credential cached");
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Io(err.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default = "current_version")]
    version: u32,
    #[serde(flatten)]
    record: CredentialRecord,
}

fn current_version() -> u32 {
    CACHE_FILE_VERSION
}

fn default_config_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "keyfetch")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".keyfetch"))
}

fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);
    builder.create(dir)
}

/// Write `data` to a sibling temp file and rename it over `path`, so a reader
/// sees either the previous file or the complete new one.
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_private_dir(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| CACHE_FILE_NAME.to_string());
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let temp_path = path.with_file_name(format!(".{file_name}.tmp-{}-{nonce}", std::process::id()));

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let write_result = (|| -> std::io::Result<()> {
        let mut temp_file = options.open(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

    Ok(())
}
