//! services/admin/src/adapters/storage.rs
//!
//! Key-value stores that implement the `KeyValueStore` port: a JSON file on
//! disk that keeps the session between runs, and an in-memory map.

use payjobber_admin_core::ports::{KeyValueStore, PortError, PortResult};
use std::collections::{BTreeMap, HashMap};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

#[cfg(unix)]
const SESSION_FILE_MODE: u32 = 0o600;

//=========================================================================================
// File-backed Store
//=========================================================================================

/// Stores every key in a single JSON object file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> PortResult<BTreeMap<String, String>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(storage_error(&self.path, e)),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| storage_error(&self.path, e))
    }

    /// Replaces the file atomically through a temp file in the same
    /// directory. The file holds a bearer token, so it is owner-only on unix.
    fn write_all(&self, entries: &BTreeMap<String, String>) -> PortResult<()> {
        let parent = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent,
            None => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(|e| storage_error(&self.path, e))?;

        let json = serde_json::to_string_pretty(entries).map_err(|e| storage_error(&self.path, e))?;
        let mut temp_file = NamedTempFile::new_in(parent).map_err(|e| storage_error(&self.path, e))?;
        temp_file
            .write_all(json.as_bytes())
            .and_then(|_| temp_file.as_file().sync_all())
            .map_err(|e| storage_error(&self.path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            temp_file
                .as_file()
                .set_permissions(std::fs::Permissions::from_mode(SESSION_FILE_MODE))
                .map_err(|e| storage_error(&self.path, e))?;
        }

        temp_file
            .persist(&self.path)
            .map_err(|e| storage_error(&self.path, e.error))?;
        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

fn storage_error(path: &Path, err: impl std::fmt::Display) -> PortError {
    PortError::Storage(format!("{}: {}", path.display(), err))
}

//=========================================================================================
// In-memory Store
//=========================================================================================

/// Keeps entries for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| PortError::Storage("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PortError::Storage("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PortError::Storage("memory store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_survives_a_new_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("session.json");

        let store = FileStorage::new(&path);
        assert_eq!(store.get("access_token").unwrap(), None);
        store.set("access_token", "T").unwrap();
        store.set("role", "admin").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("access_token").unwrap().as_deref(), Some("T"));

        reopened.remove("access_token").unwrap();
        reopened.remove("access_token").unwrap();
        assert_eq!(store.get("access_token").unwrap(), None);
        assert_eq!(store.get("role").unwrap().as_deref(), Some("admin"));
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = FileStorage::new(&path).get("access_token").unwrap_err();
        assert!(matches!(err, PortError::Storage(_)));
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStorage::new(&path);
        store.set("access_token", "T").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        store.remove("access_token").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn rewrite_leaves_no_stray_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStorage::new(&path);
        store.set("access_token", "T").unwrap();
        store.set("role", "admin").unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("session.json")]);
    }

    #[test]
    fn memory_storage_round_trip() {
        let store = MemoryStorage::new();
        store.set("username", "admin").unwrap();
        assert_eq!(store.get("username").unwrap().as_deref(), Some("admin"));
        store.remove("username").unwrap();
        assert_eq!(store.get("username").unwrap(), None);
    }
}
