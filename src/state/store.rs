use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

pub const RACK_KEY: &str = "rack";
pub const VOLUME_KEY: &str = "volume";
pub const CREDENTIALS_KEY: &str = "credentials";
pub const DEVICE_KEY: &str = "device";

/// Durable key-value entries kept in a single JSON file.
///
/// Clones share the same entries. Every write rewrites the whole file through a
/// temporary sibling and a rename, so a crash never leaves a half-written store.
/// In-memory entries change only once the file write has succeeded.
#[derive(Clone)]
pub struct Store {
    path: PathBuf,
    entries: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read store from {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse store {:?}", path))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries: Arc::new(Mutex::new(entries)),
        })
    }

    pub fn store_path(data_dir: &Path) -> PathBuf {
        data_dir.join("state.json")
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let entries = self.lock();
        entries
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone())
                    .with_context(|| format!("Failed to decode stored {:?}", key))
            })
            .transpose()
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("Failed to encode {:?} for storage", key))?;
        let mut entries = self.lock();
        let mut next = entries.clone();
        next.insert(key.to_string(), value);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.lock();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn flush(&self, entries: &BTreeMap<String, Value>) -> Result<()> {
        let content =
            serde_json::to_string_pretty(entries).context("Failed to serialize store")?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace store {:?}", self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = Store::store_path(dir.path());

        let store = Store::open(&path).unwrap();
        store.put(VOLUME_KEY, &73u8).unwrap();
        store.put(DEVICE_KEY, &"device-1").unwrap();
        store.remove(DEVICE_KEY).unwrap();

        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.get::<u8>(VOLUME_KEY).unwrap(), Some(73));
        assert_eq!(reopened.get::<String>(DEVICE_KEY).unwrap(), None);
    }

    #[test]
    fn failed_write_is_not_kept_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = Store::store_path(dir.path());
        let store = Store::open(&path).unwrap();
        store.put(VOLUME_KEY, &30u8).unwrap();
        store.put(DEVICE_KEY, &"device-1").unwrap();

        // A directory where the temporary file goes makes every flush fail.
        let blocker = path.with_extension("json.tmp");
        fs::create_dir(&blocker).unwrap();
        assert!(store.put(VOLUME_KEY, &90u8).is_err());
        assert!(store.remove(DEVICE_KEY).is_err());
        assert_eq!(store.get::<u8>(VOLUME_KEY).unwrap(), Some(30));
        assert_eq!(store.get::<String>(DEVICE_KEY).unwrap().as_deref(), Some("device-1"));

        fs::remove_dir(&blocker).unwrap();
        store.put(RACK_KEY, &"later").unwrap();

        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.get::<u8>(VOLUME_KEY).unwrap(), Some(30));
        assert_eq!(reopened.get::<String>(DEVICE_KEY).unwrap().as_deref(), Some("device-1"));
    }

    #[test]
    fn clones_share_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&Store::store_path(dir.path())).unwrap();
        let other = store.clone();

        store.put(VOLUME_KEY, &10u8).unwrap();
        assert_eq!(other.get::<u8>(VOLUME_KEY).unwrap(), Some(10));
    }
}
