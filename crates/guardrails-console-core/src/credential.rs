//! API key storage.
//!
//! Exactly one key is active at a time. It is written by the login/register
//! exchange, read before every gateway call, and erased on logout. Readers
//! never write it.

use crate::error::ConsoleError;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FINGERPRINT_LEN: usize = 12;

/// Opaque bearer token sent as `x-api-key`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw token, trimming surrounding whitespace.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ConsoleError> {
        let token = raw.as_ref().trim();
        if token.is_empty() {
            return Err(ConsoleError::InvalidArgument(
                "API key must not be empty".to_string(),
            ));
        }
        Ok(Self(token.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 prefix, safe to log.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut hexed = hex::encode(digest);
        hexed.truncate(FINGERPRINT_LEN);
        hexed
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.fingerprint())
    }
}

/// Where the key lives between runs.
pub trait CredentialBackend: Send + Sync {
    fn load(&self) -> Result<Option<String>, ConsoleError>;
    fn save(&self, token: &str) -> Result<(), ConsoleError>;
    fn erase(&self) -> Result<(), ConsoleError>;
}

/// Persists the key in a single file.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialBackend for FileBackend {
    fn load(&self) -> Result<Option<String>, ConsoleError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConsoleError::Storage(format!(
                "read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn save(&self, token: &str) -> Result<(), ConsoleError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConsoleError::Storage(format!("create {}: {}", parent.display(), e))
            })?;
        }
        std::fs::write(&self.path, token).map_err(|e| {
            ConsoleError::Storage(format!("write {}: {}", self.path.display(), e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms).map_err(|e| {
                ConsoleError::Storage(format!("chmod {}: {}", self.path.display(), e))
            })?;
        }
        Ok(())
    }

    fn erase(&self) -> Result<(), ConsoleError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ConsoleError::Storage(format!(
                "remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

/// Process-local storage, gone when the process exits.
#[derive(Default)]
pub struct MemoryBackend {
    slot: RwLock<Option<String>>,
}

impl CredentialBackend for MemoryBackend {
    fn load(&self) -> Result<Option<String>, ConsoleError> {
        Ok(self.slot.read().clone())
    }

    fn save(&self, token: &str) -> Result<(), ConsoleError> {
        *self.slot.write() = Some(token.to_string());
        Ok(())
    }

    fn erase(&self) -> Result<(), ConsoleError> {
        *self.slot.write() = None;
        Ok(())
    }
}

/// Shared handle to the single active API key.
///
/// Cloning is cheap; every clone sees the same key.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn CredentialBackend>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn CredentialBackend>) -> Self {
        Self { backend }
    }

    /// File-backed store that survives restarts.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileBackend::new(path)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::default()))
    }

    /// Replace the active key.
    pub fn set(&self, token: impl AsRef<str>) -> Result<ApiKey, ConsoleError> {
        let key = ApiKey::new(token)?;
        self.backend.save(key.expose())?;
        tracing::info!(fingerprint = %key.fingerprint(), "API key stored");
        Ok(key)
    }

    /// Current key, if any. Storage errors read as "no key".
    pub fn get(&self) -> Option<ApiKey> {
        match self.backend.load() {
            Ok(Some(raw)) => ApiKey::new(raw).ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read API key");
                None
            }
        }
    }

    pub fn is_present(&self) -> bool {
        self.get().is_some()
    }

    /// Forget the active key. Idempotent.
    pub fn clear(&self) -> Result<(), ConsoleError> {
        self.backend.erase()?;
        tracing::info!("API key cleared");
        Ok(())
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("present", &self.is_present())
            .finish()
    }
}
