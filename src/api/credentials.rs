//! Persistence for the provider API key.
//!
//! [`SecretStore`] is the small key-value seam the client writes through.
//! [`FileSecretStore`] keeps a JSON object in the platform config directory:
//!
//! | Platform | Path |
//! |----------|------|
//! | Windows  | `%APPDATA%\lyric-sync\credentials.json` |
//! | macOS    | `~/Library/Application Support/lyric-sync/credentials.json` |
//! | Linux    | `~/.config/lyric-sync/credentials.json` |
//!
//! [`MemorySecretStore`] forgets everything when dropped.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use thiserror::Error;

/// Fixed name the API key is stored under.
pub const API_KEY_NAME: &str = "apiKey";

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("secret store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("secret store is corrupt: {0}")]
    Corrupt(String),

    #[error("secret store lock poisoned")]
    Poisoned,
}

// ---------------------------------------------------------------------------
// SecretStore trait
// ---------------------------------------------------------------------------

/// Key-value persistence for secrets.
///
/// Every call is one complete transaction: `put` and `delete` have reached
/// the backing storage when they return `Ok`.
pub trait SecretStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// FileSecretStore
// ---------------------------------------------------------------------------

/// JSON-object file store. The file is created on first write.
#[derive(Debug)]
pub struct FileSecretStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within the process.
    lock: Mutex<()>,
}

impl FileSecretStore {
    /// Store at `path`, usually [`AppPaths::credentials_file`](crate::config::AppPaths::credentials_file).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_map(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&data) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StoreError::Corrupt("expected a JSON object".into())),
            Err(e) => Err(StoreError::Corrupt(e.to_string())),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(map)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        // Write a sibling file that is owner-only from creation, then swap it
        // in so readers see either the old or the new map.
        let tmp = self.tmp_path();
        match std::fs::remove_file(&tmp) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        let mut file = create_private(&tmp)?;
        file.write_all(data.as_bytes())?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let map = self.read_map()?;
        Ok(map.get(key).and_then(Value::as_str).map(str::to_string))
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemorySecretStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_missing_file_reads_as_empty() {
        let dir = tempdir().expect("temp dir");
        let store = FileSecretStore::open(dir.path().join("credentials.json"));
        assert_eq!(store.get(API_KEY_NAME).unwrap(), None);
    }

    #[test]
    fn file_store_put_get_delete() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("credentials.json");
        let store = FileSecretStore::open(&path);

        store.put(API_KEY_NAME, "sk-123").unwrap();
        assert!(path.exists());
        assert_eq!(store.get(API_KEY_NAME).unwrap().as_deref(), Some("sk-123"));

        // A second handle on the same file sees the value (survives restart).
        let reopened = FileSecretStore::open(&path);
        assert_eq!(reopened.get(API_KEY_NAME).unwrap().as_deref(), Some("sk-123"));

        store.delete(API_KEY_NAME).unwrap();
        assert_eq!(reopened.get(API_KEY_NAME).unwrap(), None);
    }

    #[test]
    fn file_store_keeps_other_entries() {
        let dir = tempdir().expect("temp dir");
        let store = FileSecretStore::open(dir.path().join("credentials.json"));

        store.put("other", "x").unwrap();
        store.put(API_KEY_NAME, "k").unwrap();
        store.delete(API_KEY_NAME).unwrap();

        assert_eq!(store.get("other").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn file_store_reports_corrupt_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let store = FileSecretStore::open(&path);
        assert!(matches!(store.get(API_KEY_NAME), Err(StoreError::Corrupt(_))));
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("credentials.json");
        FileSecretStore::open(&path).put(API_KEY_NAME, "k").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    /// A pre-existing world-readable file is replaced, not rewritten in
    /// place, so the key never lands in a file others can read.
    #[cfg(unix)]
    #[test]
    fn file_store_replaces_loose_file_and_leaves_no_temp() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        // Leftover from an interrupted write.
        std::fs::write(dir.path().join("credentials.json.tmp"), "stale").unwrap();

        let store = FileSecretStore::open(&path);
        store.put(API_KEY_NAME, "k").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!dir.path().join("credentials.json.tmp").exists());
        assert_eq!(store.get(API_KEY_NAME).unwrap().as_deref(), Some("k"));
    }

    #[test]
    fn memory_store_put_get_delete() {
        let store = MemorySecretStore::new();
        assert_eq!(store.get(API_KEY_NAME).unwrap(), None);
        store.put(API_KEY_NAME, "abc").unwrap();
        assert_eq!(store.get(API_KEY_NAME).unwrap().as_deref(), Some("abc"));
        store.delete(API_KEY_NAME).unwrap();
        assert_eq!(store.get(API_KEY_NAME).unwrap(), None);
    }
}
