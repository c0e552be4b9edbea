//! Durable key-value storage for in-progress state.
//!
//! Values are opaque strings; callers own their encoding. This is recovery
//! storage only, never the source of truth for finished sessions.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use anyhow::{Context, Result};
use log::warn;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, String>> {
        match self.values.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.guard().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.guard().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.guard().remove(key);
        Ok(())
    }
}

/// Whole-file JSON object, rewritten on every mutation.
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create snapshot directory {}", parent.display())
            })?;
        }

        let values = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read snapshots from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Discarding unreadable snapshot file {}: {err}", path.display());
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn guard(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        match self.values.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let serialized = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write snapshots to {}", self.path.display()))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.guard().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let mut guard = self.guard();
        guard.insert(key.to_string(), value);
        self.persist(&guard)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut guard = self.guard();
        if guard.remove(key).is_some() {
            self.persist(&guard)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.json");

        let store = JsonFileStore::open(path.clone()).unwrap();
        store.set("isStarted_day1", "true".into()).unwrap();
        store.set("weights_day1", "{}".into()).unwrap();
        store.remove("weights_day1").unwrap();

        let reopened = JsonFileStore::open(path).unwrap();
        assert_eq!(reopened.get("isStarted_day1").as_deref(), Some("true"));
        assert_eq!(reopened.get("weights_day1"), None);
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.json");
        fs::write(&path, "[1, 2").unwrap();

        let store = JsonFileStore::open(path).unwrap();
        assert_eq!(store.get("isStarted_day1"), None);
    }

    #[test]
    fn removing_missing_key_is_fine() {
        let store = MemoryStore::new();
        store.remove("nothing").unwrap();
        assert!(store.is_empty());
    }
}
