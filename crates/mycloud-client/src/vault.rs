//! Persisted session credential.
//!
//! The session token is the only piece of client state that outlives the
//! process. It is sealed with XChaCha20-Poly1305 before it touches disk and
//! stored under a single fixed key.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use mycloud_shared::constants::TOKEN_STORAGE_KEY;
use mycloud_shared::crypto::{self, SymmetricKey};

use crate::error::Result;

/// String key-value persistence.
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (or create) the storage directory.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        debug!(path = %dir.display(), "opened local storage");
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // keys are compile-time constants, but never let one escape the directory
        let safe: String = key
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        self.dir.join(safe)
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}

/// Sealed storage for the session token.
#[derive(Clone)]
pub struct TokenVault {
    storage: Arc<dyn LocalStorage>,
    key: SymmetricKey,
}

impl TokenVault {
    pub fn new(storage: Arc<dyn LocalStorage>, secret: &str) -> Self {
        Self {
            storage,
            key: crypto::derive_token_key(secret),
        }
    }

    /// A vault backed by [`MemoryStorage`].
    pub fn ephemeral(secret: &str) -> Self {
        Self::new(Arc::new(MemoryStorage::new()), secret)
    }

    /// Overwrite the stored token.
    pub fn store(&self, token: &str) -> Result<()> {
        let sealed = crypto::seal_token(&self.key, token)?;
        self.storage.set(TOKEN_STORAGE_KEY, &sealed)
    }

    /// The stored token, if one exists and can be opened.
    ///
    /// A value sealed under a different secret (or corrupted on disk) is
    /// removed and reported as absent.
    pub fn load(&self) -> Option<String> {
        let sealed = match self.storage.get(TOKEN_STORAGE_KEY) {
            Ok(Some(sealed)) => sealed,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                return None;
            }
        };

        match crypto::open_token(&self.key, &sealed) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable stored token");
                self.clear();
                None
            }
        }
    }

    pub fn has_token(&self) -> bool {
        self.load().is_some()
    }

    /// Delete the stored token. Failures are logged, never raised: a
    /// credential that cannot be deleted must not block a logout.
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(TOKEN_STORAGE_KEY) {
            warn!(error = %e, "Failed to remove stored token");
        }
    }
}

impl std::fmt::Debug for TokenVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVault").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_load_clear() {
        let vault = TokenVault::ephemeral("secret");
        assert!(vault.load().is_none());

        vault.store("abc").unwrap();
        assert_eq!(vault.load().as_deref(), Some("abc"));

        vault.store("def").unwrap();
        assert_eq!(vault.load().as_deref(), Some("def"));

        vault.clear();
        assert!(!vault.has_token());
    }

    #[test]
    fn test_stored_value_is_sealed() {
        let storage = Arc::new(MemoryStorage::new());
        let vault = TokenVault::new(storage.clone(), "secret");
        vault.store("plain-token").unwrap();

        let raw = storage.get(TOKEN_STORAGE_KEY).unwrap().unwrap();
        assert!(!raw.contains("plain-token"));
    }

    #[test]
    fn test_wrong_secret_discards_token() {
        let storage = Arc::new(MemoryStorage::new());
        TokenVault::new(storage.clone(), "old").store("abc").unwrap();

        let vault = TokenVault::new(storage.clone(), "new");
        assert!(vault.load().is_none());
        assert!(storage.get(TOKEN_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_file_storage_persists() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::open(dir.path()).unwrap());

        TokenVault::new(storage, "secret").store("persisted").unwrap();

        let reopened = Arc::new(FileStorage::open(dir.path()).unwrap());
        let vault = TokenVault::new(reopened, "secret");
        assert_eq!(vault.load().as_deref(), Some("persisted"));

        vault.clear();
        vault.clear();
        assert!(vault.load().is_none());
    }
}
