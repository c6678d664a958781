use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::models::{StarshipDraft, StarshipPatch};
use crate::storage::Storage;

/// Storage key for the persisted operation list.
const QUEUE_KEY: &str = "starships_offline_queue";

/// A pending write, tagged by kind. Each variant carries only the fields
/// its replay needs; the wire shape keeps the stored field names
/// (`operation`, `data`, `recordId`) so queues written by older builds
/// still parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum OperationKind {
    Insert {
        data: StarshipDraft,
    },
    Update {
        #[serde(rename = "recordId")]
        record_id: String,
        data: StarshipPatch,
    },
    Delete {
        #[serde(rename = "recordId")]
        record_id: String,
    },
}

impl OperationKind {
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Insert { .. } => "insert",
            OperationKind::Update { .. } => "update",
            OperationKind::Delete { .. } => "delete",
        }
    }
}

/// A queue entry: the operation plus its identity and enqueue time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedOperation {
    pub id: String,
    pub table: String,
    #[serde(flatten)]
    pub kind: OperationKind,
    pub timestamp: i64,
}

/// The persisted operation log.
///
/// Mutations are whole-list read-modify-write against the storage port;
/// two writers sharing a store can lose an update. A single embedding
/// context is assumed.
///
/// Every mutation publishes the new length on a watch channel so status
/// observers keep their pending count live without polling.
pub struct OperationQueue {
    storage: Arc<dyn Storage>,
    count_tx: watch::Sender<usize>,
}

impl OperationQueue {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let initial = read_queue(storage.as_ref()).len();
        let (count_tx, _) = watch::channel(initial);
        Self { storage, count_tx }
    }

    /// Append a new operation, assigning it an id and enqueue timestamp.
    /// Returns the stored entry.
    pub fn add(&self, table: &str, kind: OperationKind) -> QueuedOperation {
        let now = Utc::now().timestamp_millis();
        // Best-effort uniqueness: kind + millis + random suffix
        let id = format!("{}_{}_{}", kind.name(), now, rand::random::<u32>());
        let op = QueuedOperation {
            id,
            table: table.to_string(),
            kind,
            timestamp: now,
        };

        let mut queue = self.get_all();
        queue.push(op.clone());
        self.persist(&queue);
        debug!(id = %op.id, operation = op.kind.name(), pending = queue.len(), "Queued operation");
        op
    }

    /// The full persisted list in insertion order. Empty when storage is
    /// absent or the list is unreadable.
    pub fn get_all(&self) -> Vec<QueuedOperation> {
        read_queue(self.storage.as_ref())
    }

    /// Remove the entry with the given id, if present.
    pub fn remove(&self, id: &str) {
        let queue: Vec<QueuedOperation> = self
            .get_all()
            .into_iter()
            .filter(|op| op.id != id)
            .collect();
        self.persist(&queue);
    }

    /// Drop the whole queue.
    pub fn clear_all(&self) {
        self.storage.remove(QUEUE_KEY);
        self.count_tx.send_replace(0);
    }

    pub fn count(&self) -> usize {
        self.get_all().len()
    }

    /// Watch the queue length. The receiver holds the current value at
    /// subscription time.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.count_tx.subscribe()
    }

    fn persist(&self, queue: &[QueuedOperation]) {
        match serde_json::to_string(queue) {
            Ok(contents) => self.storage.set(QUEUE_KEY, &contents),
            Err(e) => debug!(error = %e, "Failed to serialize operation queue"),
        }
        self.count_tx.send_replace(queue.len());
    }
}

fn read_queue(storage: &dyn Storage) -> Vec<QueuedOperation> {
    let Some(raw) = storage.get(QUEUE_KEY) else {
        return Vec::new();
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        debug!(error = %e, "Corrupt operation queue, treating as empty");
        Vec::new()
    })
}

// ============================================================================
// Tests
// ============================================================================
