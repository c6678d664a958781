//! Shared test fixtures: a deterministic in-memory backend and model
//! builders. Test-only.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::api::{BackendError, RemoteBackend, SelectFilter};
use crate::models::{Starship, StarshipDraft};

/// In-memory record store with per-operation failure injection and call
/// counters. One table is enough for these tests; the `table` argument is
/// ignored.
pub struct MockBackend {
    records: Mutex<Vec<Value>>,
    next_id: AtomicUsize,
    select_count: AtomicUsize,
    insert_count: AtomicUsize,
    update_count: AtomicUsize,
    delete_count: AtomicUsize,
    fail_selects: AtomicBool,
    fail_inserts: AtomicBool,
    fail_updates: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            select_count: AtomicUsize::new(0),
            insert_count: AtomicUsize::new(0),
            update_count: AtomicUsize::new(0),
            delete_count: AtomicUsize::new(0),
            fail_selects: AtomicBool::new(false),
            fail_inserts: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn seed(&self, record: Value) {
        self.records.lock().unwrap().push(record);
    }

    pub fn records(&self) -> Vec<Value> {
        self.records.lock().unwrap().clone()
    }

    pub fn select_calls(&self) -> usize {
        self.select_count.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_count.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_count.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_count.load(Ordering::SeqCst)
    }

    pub fn fail_selects(&self, fail: bool) {
        self.fail_selects.store(fail, Ordering::SeqCst);
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    fn injected() -> BackendError {
        BackendError::ServerError("injected failure".to_string())
    }

    fn field_contains(record: &Value, column: &str, lowered: &str) -> bool {
        record
            .get(column)
            .and_then(Value::as_str)
            .map(|v| v.to_lowercase().contains(lowered))
            .unwrap_or(false)
    }
}

#[async_trait]
impl RemoteBackend for MockBackend {
    async fn select(&self, _table: &str, filter: &SelectFilter) -> Result<Vec<Value>, BackendError> {
        self.select_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_selects.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        let records = self.records.lock().unwrap();
        let matched = match filter {
            SelectFilter::All => records.clone(),
            SelectFilter::Eq { column, value } => records
                .iter()
                .filter(|r| r.get(column).and_then(Value::as_str) == Some(value.as_str()))
                .cloned()
                .collect(),
            SelectFilter::IlikeAny { columns, pattern } => {
                let lowered = pattern.to_lowercase();
                records
                    .iter()
                    .filter(|r| columns.iter().any(|c| Self::field_contains(r, c, &lowered)))
                    .cloned()
                    .collect()
            }
        };
        Ok(matched)
    }

    async fn insert(&self, _table: &str, record: Value) -> Result<Value, BackendError> {
        self.insert_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        let mut record = record;
        let obj = record
            .as_object_mut()
            .ok_or_else(|| BackendError::InvalidResponse("insert payload is not an object".to_string()))?;
        if !obj.contains_key("id") {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            obj.insert("id".to_string(), Value::String(format!("srv_{}", id)));
        }
        obj.entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update(&self, _table: &str, id: &str, patch: Value) -> Result<Value, BackendError> {
        self.update_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
            .ok_or_else(|| BackendError::NotFound(format!("no record with id {}", id)))?;
        if let (Some(target), Some(fields)) = (record.as_object_mut(), patch.as_object()) {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(record.clone())
    }

    async fn delete(&self, _table: &str, id: &str) -> Result<(), BackendError> {
        self.delete_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.records
            .lock()
            .unwrap()
            .retain(|r| r.get("id").and_then(Value::as_str) != Some(id));
        Ok(())
    }
}

pub fn draft(name: &str) -> StarshipDraft {
    StarshipDraft {
        name: name.to_string(),
        faction: None,
        corporation: None,
        ship_class: None,
        image: None,
        shield_points: None,
        hull_points: None,
        armaments: None,
        description: None,
    }
}

pub fn ship(id: &str, name: &str, faction: &str) -> Starship {
    Starship {
        id: id.to_string(),
        name: name.to_string(),
        faction: Some(faction.to_string()),
        corporation: None,
        ship_class: None,
        image: None,
        shield_points: None,
        hull_points: None,
        armaments: None,
        description: None,
        created_at: Utc::now(),
    }
}
