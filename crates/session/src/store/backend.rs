//! Key-value storage surfaces for the persisted session

use crate::error::StoreError;
use directories::ProjectDirs;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::{debug, warn};

/// One change inside a [`StorageBackend::apply`] batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageWrite<'a> {
    Set(&'a str, &'a str),
    Remove(&'a str),
}

/// Last-writer-wins string storage keyed by name
///
/// `get_many` and `apply` see or change several keys as one step, so related
/// entries never appear half updated.
pub trait StorageBackend: Send + Sync {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError>;
    fn apply(&self, writes: &[StorageWrite<'_>]) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get_many(&[key])?.pop().flatten())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.apply(&[StorageWrite::Set(key, value)])
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.apply(&[StorageWrite::Remove(key)])
    }
}

/// Process-local storage; lost on exit
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(keys.iter().map(|key| entries.get(*key).cloned()).collect())
    }

    fn apply(&self, writes: &[StorageWrite<'_>]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for write in writes {
            match *write {
                StorageWrite::Set(key, value) => {
                    entries.insert(key.to_string(), value.to_string());
                }
                StorageWrite::Remove(key) => {
                    entries.remove(key);
                }
            }
        }
        Ok(())
    }
}

/// JSON object on disk, one string entry per key
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so readers never see a half-written document.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `session.json` under the platform data directory
    pub fn default_path() -> PathBuf {
        match ProjectDirs::from("dev", "Portal", "Portal") {
            Some(dirs) => dirs.data_dir().join("session.json"),
            None => {
                warn!("Failed to determine platform data directory, using ./data");
                PathBuf::from("./data/session.json")
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(err.into()),
        };
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(map)?)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), entries = map.len(), "Session file written");
        Ok(())
    }
}

impl StorageBackend for FileStorage {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let map = self.read_map()?;
        Ok(keys
            .iter()
            .map(|key| map.get(*key).and_then(Value::as_str).map(str::to_string))
            .collect())
    }

    /// One read-modify-write of the whole file for the entire batch
    fn apply(&self, writes: &[StorageWrite<'_>]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map()?;
        for write in writes {
            match *write {
                StorageWrite::Set(key, value) => {
                    map.insert(key.to_string(), Value::String(value.to_string()));
                }
                StorageWrite::Remove(key) => {
                    map.remove(key);
                }
            }
        }
        self.write_map(&map)
    }
}
