use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::ClientResult;

pub const API_KEY: &str = "normalRouteBuilderApiKey";
pub const UA_ACCESS: &str = "uaExpandedSaverAuth";

const STORE_FILE: &str = "local-storage.json";
const STORE_TMP_FILE: &str = "local-storage.json.tmp";

/// Small persistent key/value store backed by one JSON file.
/// Reads and writes are synchronous; the last write wins.
pub struct LocalStore {
    path: PathBuf,
    tmp_path: PathBuf,
    lock: Mutex<()>,
}

impl LocalStore {
    /// Open (or lazily create) the store inside `dir`.
    pub fn open(dir: impl AsRef<Path>) -> ClientResult<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            path: dir.as_ref().join(STORE_FILE),
            tmp_path: dir.as_ref().join(STORE_TMP_FILE),
            lock: Mutex::new(()),
        })
    }

    fn read_all(&self) -> ClientResult<BTreeMap<String, Value>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the whole map to a sibling file, then rename it over the store
    /// so readers never see a partial file.
    fn write_all(&self, entries: &BTreeMap<String, Value>) -> ClientResult<()> {
        let mut file = fs::File::create(&self.tmp_path)?;
        file.write_all(&serde_json::to_vec_pretty(entries)?)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&self.tmp_path, &self.path)?;
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> ClientResult<Option<T>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        match self.read_all()?.remove(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> ClientResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), serde_json::to_value(value)?);
        self.write_all(&entries)
    }

    pub fn remove(&self, key: &str) -> ClientResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }

    pub fn api_key(&self) -> ClientResult<Option<String>> {
        Ok(self
            .get::<String>(API_KEY)?
            .filter(|key| !key.trim().is_empty()))
    }

    pub fn set_api_key(&self, key: &str) -> ClientResult<()> {
        self.set(API_KEY, &key.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        assert_eq!(store.api_key().unwrap(), None);
        store.set_api_key("  pro_abc  ").unwrap();
        assert_eq!(store.api_key().unwrap().as_deref(), Some("pro_abc"));

        store.set(UA_ACCESS, &serde_json::json!({"description": "beta"})).unwrap();
        store.remove(UA_ACCESS).unwrap();
        assert!(store.get::<Value>(UA_ACCESS).unwrap().is_none());
        assert!(store.api_key().unwrap().is_some());
    }

    #[test]
    fn test_write_replaces_store_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        store.set_api_key("first").unwrap();

        // a leftover from an interrupted write is overwritten, never read
        fs::write(dir.path().join(STORE_TMP_FILE), b"{\"normalRouteBuil").unwrap();
        assert_eq!(store.api_key().unwrap().as_deref(), Some("first"));

        store.set_api_key("second").unwrap();
        assert_eq!(store.api_key().unwrap().as_deref(), Some("second"));
        assert!(!dir.path().join(STORE_TMP_FILE).exists());

        let raw = fs::read_to_string(dir.path().join(STORE_FILE)).unwrap();
        let parsed: BTreeMap<String, Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed[API_KEY], "second");
    }

    #[test]
    fn test_last_write_wins_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let first = LocalStore::open(dir.path()).unwrap();
        let second = LocalStore::open(dir.path()).unwrap();

        first.set_api_key("one").unwrap();
        second.set_api_key("two").unwrap();
        assert_eq!(first.api_key().unwrap().as_deref(), Some("two"));
    }
}
