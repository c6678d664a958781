use std::collections::HashMap;
use std::sync::Mutex;

use super::Storage;

/// In-memory storage backend.
///
/// Used by tests and by embeddings that do not want persistence. Nothing
/// survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().expect("storage mutex poisoned").get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.map
            .lock()
            .expect("storage mutex poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.map.lock().expect("storage mutex poisoned").remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.map
            .lock()
            .expect("storage mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("a"), None);

        storage.set("a", "1");
        assert_eq!(storage.get("a").as_deref(), Some("1"));

        storage.set("a", "2");
        assert_eq!(storage.get("a").as_deref(), Some("2"));

        storage.remove("a");
        assert_eq!(storage.get("a"), None);
    }

    #[test]
    fn test_keys() {
        let storage = MemoryStorage::new();
        storage.set("x", "1");
        storage.set("y", "2");
        let mut keys = storage.keys();
        keys.sort();
        assert_eq!(keys, vec!["x", "y"]);
    }
}
