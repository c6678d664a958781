use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::warn;

use super::Storage;

/// Store file name inside the storage directory
const STORE_FILE: &str = "storage.json";

/// File-backed storage: the whole key space lives in one JSON document,
/// re-read and rewritten on every mutation.
///
/// The coarse granularity keeps `keys()` exact and mirrors the
/// read-modify-write discipline of the browser store this replaces. A
/// process-local mutex serializes access within one embedding; concurrent
/// processes sharing the file race with last-write-wins.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Create a file store under `dir`, creating the directory if needed.
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create storage directory: {}", dir.display()))?;
        Ok(Self {
            path: dir.join(STORE_FILE),
            lock: Mutex::new(()),
        })
    }

    fn load_map(&self) -> HashMap<String, String> {
        if !self.path.exists() {
            return HashMap::new();
        }
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "Corrupt storage file, starting empty");
                HashMap::new()
            }),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read storage file");
                HashMap::new()
            }
        }
    }

    fn store_map(&self, map: &HashMap<String, String>) {
        let contents = match serde_json::to_string(map) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(error = %e, "Failed to serialize storage map");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, contents) {
            warn!(path = %self.path.display(), error = %e, "Failed to write storage file");
        }
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().expect("storage mutex poisoned");
        self.load_map().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let _guard = self.lock.lock().expect("storage mutex poisoned");
        let mut map = self.load_map();
        map.insert(key.to_string(), value.to_string());
        self.store_map(&map);
    }

    fn remove(&self, key: &str) {
        let _guard = self.lock.lock().expect("storage mutex poisoned");
        let mut map = self.load_map();
        if map.remove(key).is_some() {
            self.store_map(&map);
        }
    }

    fn keys(&self) -> Vec<String> {
        let _guard = self.lock.lock().expect("storage mutex poisoned");
        self.load_map().keys().cloned().collect()
    }
}
