//! Snapshot storage: in-memory and JSON-file key-value stores
//!
//! Each logical document (player account, admin users, transaction log, game
//! catalog, admin session) lives under a fixed key as one JSON snapshot.

use crate::common::KeyValueStore;
use crate::errors::{LuxeResult, StorageError};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

pub const PLAYER_ACCOUNT_KEY: &str = "luxeplay_user";
pub const ADMIN_USERS_KEY: &str = "luxeplay_admin_users";
pub const TRANSACTIONS_KEY: &str = "luxeplay_transactions";
pub const GAMES_KEY: &str = "luxeplay_games";
pub const CURRENT_ADMIN_KEY: &str = "luxeplay_current_admin";

/// Process-local store; contents vanish with the process
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> LuxeResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> LuxeResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> LuxeResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> LuxeResult<Vec<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// One `<key>.json` file per key inside a data directory.
///
/// Writes go to a temporary file in the same directory and are renamed into
/// place, so a reader never sees a half-written snapshot.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn open<P: AsRef<Path>>(root: P) -> LuxeResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .map_err(|e| StorageError::WriteFailed(format!("{}: {}", root.display(), e)))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> LuxeResult<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(format!("{}: {}", path.display(), e)).into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> LuxeResult<()> {
        let path = self.path_for(key);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        tmp.write_all(value.as_bytes())
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        tmp.persist(&path)
            .map_err(|e| StorageError::WriteFailed(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> LuxeResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::WriteFailed(e.to_string()).into()),
        }
    }

    fn keys(&self) -> LuxeResult<Vec<String>> {
        let mut keys = Vec::new();
        let dir = std::fs::read_dir(&self.root)
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?;
        for entry in dir {
            let entry = entry.map_err(|e| StorageError::ReadFailed(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Load and decode the snapshot stored under `key`
pub fn load_snapshot<T, S>(store: &S, key: &str) -> LuxeResult<Option<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };

    let value = serde_json::from_str(&raw).map_err(|e| {
        StorageError::CorruptedData(format!("Failed to decode snapshot '{}': {}", key, e))
    })?;
    Ok(Some(value))
}

/// Encode `value` and replace the snapshot stored under `key`
pub fn store_snapshot<T, S>(store: &S, key: &str, value: &T) -> LuxeResult<()>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|e| {
        StorageError::WriteFailed(format!("Failed to encode snapshot '{}': {}", key, e))
    })?;
    store.set(key, &raw).map_err(|e| {
        tracing::warn!(key, error = %e, "Snapshot write failed");
        e
    })
}
