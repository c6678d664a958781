use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::{BackendError, RemoteBackend};
use crate::connectivity::Connectivity;
use crate::queue::{OperationKind, OperationQueue, QueuedOperation};
use crate::storage::Storage;

/// Storage key for the last completed sync run marker (epoch millis).
const LAST_SYNC_KEY: &str = "starships_last_sync";

/// Aggregate result of one drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// True iff zero failures in the run.
    pub success: bool,
    /// Operations successfully replayed and removed from the queue.
    pub processed: u32,
    /// Operations that errored and remain queued.
    pub failed: u32,
}

impl SyncOutcome {
    pub(crate) fn skipped_offline() -> Self {
        Self {
            success: false,
            processed: 0,
            failed: 0,
        }
    }
}

/// Drains the operation queue against the remote backend.
pub struct SyncManager {
    backend: Arc<dyn RemoteBackend>,
    queue: Arc<OperationQueue>,
    connectivity: Arc<dyn Connectivity>,
    storage: Arc<dyn Storage>,
    drain_guard: Mutex<()>,
}

impl SyncManager {
    pub fn new(
        backend: Arc<dyn RemoteBackend>,
        queue: Arc<OperationQueue>,
        connectivity: Arc<dyn Connectivity>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            backend,
            queue,
            connectivity,
            storage,
            drain_guard: Mutex::new(()),
        }
    }

    /// Replay every currently queued operation, in order.
    ///
    /// Offline is a no-op reported as `success: false`. A failed replay
    /// leaves that operation queued and moves on to the next one; it will
    /// be retried on the next drain, with no backoff and no retry cap.
    /// Operations enqueued while a drain is running are not part of its
    /// snapshot and wait for the next trigger.
    pub async fn process_queue(&self) -> SyncOutcome {
        if !self.connectivity.is_online() {
            debug!("Still offline, skipping sync");
            return SyncOutcome::skipped_offline();
        }

        // One drain at a time. A reconnect-triggered drain racing a manual
        // one waits here, then operates on whatever queue the first left.
        let _guard = self.drain_guard.lock().await;

        let snapshot = self.queue.get_all();
        if snapshot.is_empty() {
            debug!("No pending operations");
            return SyncOutcome {
                success: true,
                processed: 0,
                failed: 0,
            };
        }

        info!(pending = snapshot.len(), "Processing queued operations");
        let mut processed = 0u32;
        let mut failed = 0u32;

        for op in &snapshot {
            match self.execute_operation(op).await {
                Ok(()) => {
                    self.queue.remove(&op.id);
                    processed += 1;
                    debug!(id = %op.id, operation = op.kind.name(), "Replayed operation");
                }
                Err(e) => {
                    failed += 1;
                    warn!(id = %op.id, operation = op.kind.name(), error = %e, "Replay failed, keeping operation queued");
                }
            }
        }

        self.storage
            .set(LAST_SYNC_KEY, &Utc::now().timestamp_millis().to_string());

        info!(processed, failed, "Sync complete");
        SyncOutcome {
            success: failed == 0,
            processed,
            failed,
        }
    }

    /// Replay a single operation. Backend errors propagate to the caller;
    /// this is the sync layer's only error boundary.
    pub async fn execute_operation(&self, op: &QueuedOperation) -> Result<(), BackendError> {
        match &op.kind {
            OperationKind::Insert { data } => {
                let record = to_payload(data)?;
                self.backend.insert(&op.table, record).await?;
            }
            OperationKind::Update { record_id, data } => {
                let patch = to_payload(data)?;
                self.backend.update(&op.table, record_id, patch).await?;
            }
            OperationKind::Delete { record_id } => {
                self.backend.delete(&op.table, record_id).await?;
            }
        }
        Ok(())
    }

    /// Timestamp of the most recent completed drain, if any.
    pub fn get_last_sync(&self) -> Option<DateTime<Utc>> {
        let raw = self.storage.get(LAST_SYNC_KEY)?;
        let millis: i64 = raw.parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}

fn to_payload<T: serde::Serialize>(data: &T) -> Result<serde_json::Value, BackendError> {
    serde_json::to_value(data)
        .map_err(|e| BackendError::InvalidResponse(format!("Unserializable payload: {}", e)))
}

// ============================================================================
// Tests
// ============================================================================
