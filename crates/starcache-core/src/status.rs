//! Live online/sync status for the UI layer.
//!
//! A [`StatusHandle`] owns one background task subscribed to connectivity
//! transitions and queue-size changes. Reconnecting triggers an automatic
//! drain; the UI reads or watches the [`OnlineStatus`] snapshot and can
//! force a drain with [`StatusHandle::manual_sync`]. The handle is an
//! explicit object with a `dispose()` teardown, constructed once at
//! application start.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::connectivity::{Connectivity, ConnectivityEvent, NetworkMonitor};
use crate::queue::OperationQueue;
use crate::sync::{SyncManager, SyncOutcome};

/// Point-in-time view of the offline layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineStatus {
    pub is_online: bool,
    /// Queue length - writes waiting for replay.
    pub pending_operations: usize,
    /// Completion time of the most recent drain, if any.
    pub last_sync: Option<DateTime<Utc>>,
    /// True only while a drain is in flight.
    pub is_syncing: bool,
}

struct StatusInner {
    sync: Arc<SyncManager>,
    queue: Arc<OperationQueue>,
    monitor: Arc<NetworkMonitor>,
    status_tx: watch::Sender<OnlineStatus>,
}

impl StatusInner {
    async fn handle_online(&self) {
        self.status_tx.send_modify(|s| {
            s.is_online = true;
            s.is_syncing = true;
        });

        let outcome = self.sync.process_queue().await;
        debug!(
            processed = outcome.processed,
            failed = outcome.failed,
            "Reconnect sync finished"
        );

        self.status_tx.send_modify(|s| {
            s.pending_operations = self.queue.count();
            s.last_sync = self.sync.get_last_sync();
            s.is_syncing = false;
        });
    }

    fn handle_offline(&self) {
        self.status_tx.send_modify(|s| s.is_online = false);
    }

    fn refresh_pending(&self) {
        let pending = self.queue.count();
        self.status_tx.send_modify(|s| s.pending_operations = pending);
    }
}

/// Observer handle. Dropping it (or calling [`dispose`](Self::dispose))
/// stops the listener task; the status snapshot freezes but `manual_sync`
/// keeps working.
pub struct StatusHandle {
    inner: Arc<StatusInner>,
    listener: JoinHandle<()>,
}

impl StatusHandle {
    /// Wire up the observer and spawn its listener task. Requires a tokio
    /// runtime.
    pub fn new(
        sync: Arc<SyncManager>,
        queue: Arc<OperationQueue>,
        monitor: Arc<NetworkMonitor>,
    ) -> Self {
        let initial = OnlineStatus {
            is_online: monitor.is_online(),
            pending_operations: queue.count(),
            last_sync: sync.get_last_sync(),
            is_syncing: false,
        };
        let (status_tx, _) = watch::channel(initial);

        let inner = Arc::new(StatusInner {
            sync,
            queue,
            monitor,
            status_tx,
        });

        let listener = tokio::spawn(listen(inner.clone()));
        Self { inner, listener }
    }

    /// Current snapshot.
    pub fn status(&self) -> OnlineStatus {
        self.inner.status_tx.borrow().clone()
    }

    /// Watch snapshot updates reactively.
    pub fn subscribe(&self) -> watch::Receiver<OnlineStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Drain the queue now. While offline this is a no-op reported as
    /// `success: false` and the queue is left untouched.
    pub async fn manual_sync(&self) -> SyncOutcome {
        if !self.inner.monitor.is_online() {
            warn!("Cannot sync while offline");
            return SyncOutcome::skipped_offline();
        }

        self.inner.status_tx.send_modify(|s| s.is_syncing = true);
        let outcome = self.inner.sync.process_queue().await;
        // is_syncing resets regardless of how the drain went
        self.inner.status_tx.send_modify(|s| {
            s.pending_operations = self.inner.queue.count();
            s.last_sync = self.inner.sync.get_last_sync();
            s.is_syncing = false;
        });
        outcome
    }

    /// Stop the listener task. Idempotent.
    pub fn dispose(&self) {
        self.listener.abort();
    }
}

impl Drop for StatusHandle {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn listen(inner: Arc<StatusInner>) {
    let mut events = inner.monitor.subscribe();
    let mut counts = inner.queue.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ConnectivityEvent::Online) => inner.handle_online().await,
                Ok(ConnectivityEvent::Offline) => inner.handle_offline(),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Missed transitions; fall back to the current state
                    warn!(skipped, "Connectivity events lagged, resyncing from monitor");
                    if inner.monitor.is_online() {
                        inner.handle_online().await;
                    } else {
                        inner.handle_offline();
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            changed = counts.changed() => match changed {
                Ok(()) => inner.refresh_pending(),
                Err(_) => break,
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::queue::OperationKind;
    use crate::storage::MemoryStorage;
    use crate::testutil::{draft, MockBackend};

    struct Fixture {
        queue: Arc<OperationQueue>,
        monitor: Arc<NetworkMonitor>,
        handle: StatusHandle,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let backend = Arc::new(MockBackend::new());
        let queue = Arc::new(OperationQueue::new(storage.clone()));
        let monitor = Arc::new(NetworkMonitor::new());
        let sync = Arc::new(SyncManager::new(
            backend,
            queue.clone(),
            monitor.clone(),
            storage,
        ));
        let handle = StatusHandle::new(sync, queue.clone(), monitor.clone());
        Fixture {
            queue,
            monitor,
            handle,
        }
    }

    async fn wait_until(
        rx: &mut watch::Receiver<OnlineStatus>,
        predicate: impl FnMut(&OnlineStatus) -> bool,
    ) -> OnlineStatus {
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
            .await
            .expect("status update timed out")
            .expect("status channel closed")
            .clone()
    }

    #[tokio::test]
    async fn test_initial_snapshot() {
        let f = fixture();
        let status = f.handle.status();
        assert!(status.is_online);
        assert_eq!(status.pending_operations, 0);
        assert_eq!(status.last_sync, None);
        assert!(!status.is_syncing);
    }

    #[tokio::test]
    async fn test_manual_sync_while_offline_is_a_noop() {
        let f = fixture();
        f.queue
            .add("starships", OperationKind::Insert { data: draft("a") });
        f.monitor.set_online(false);

        let outcome = f.handle.manual_sync().await;

        assert_eq!(
            outcome,
            SyncOutcome {
                success: false,
                processed: 0,
                failed: 0
            }
        );
        assert_eq!(f.queue.count(), 1);
    }

    #[tokio::test]
    async fn test_manual_sync_drains_and_updates_snapshot() {
        let f = fixture();
        f.queue
            .add("starships", OperationKind::Insert { data: draft("a") });

        let outcome = f.handle.manual_sync().await;

        assert!(outcome.success);
        assert_eq!(outcome.processed, 1);
        let status = f.handle.status();
        assert_eq!(status.pending_operations, 0);
        assert!(status.last_sync.is_some());
        assert!(!status.is_syncing);
    }

    #[tokio::test]
    async fn test_offline_transition_updates_snapshot_without_sync() {
        let f = fixture();
        let mut rx = f.handle.subscribe();

        f.monitor.set_online(false);
        let status = wait_until(&mut rx, |s| !s.is_online).await;
        assert!(!status.is_syncing);
    }

    #[tokio::test]
    async fn test_reconnect_triggers_automatic_drain() {
        let f = fixture();
        let mut rx = f.handle.subscribe();

        f.monitor.set_online(false);
        wait_until(&mut rx, |s| !s.is_online).await;

        f.queue
            .add("starships", OperationKind::Insert { data: draft("queued") });
        wait_until(&mut rx, |s| s.pending_operations == 1).await;

        f.monitor.set_online(true);
        let status = wait_until(&mut rx, |s| {
            s.is_online && !s.is_syncing && s.pending_operations == 0
        })
        .await;

        assert!(status.last_sync.is_some());
        assert_eq!(f.queue.count(), 0);
    }

    #[tokio::test]
    async fn test_queue_growth_is_reflected_live() {
        let f = fixture();
        let mut rx = f.handle.subscribe();
        f.monitor.set_online(false);
        wait_until(&mut rx, |s| !s.is_online).await;

        f.queue
            .add("starships", OperationKind::Insert { data: draft("a") });
        f.queue
            .add("starships", OperationKind::Insert { data: draft("b") });

        let status = wait_until(&mut rx, |s| s.pending_operations == 2).await;
        assert!(!status.is_online);
    }

    #[tokio::test]
    async fn test_dispose_stops_listener_but_manual_sync_survives() {
        let f = fixture();
        f.handle.dispose();
        f.handle.dispose(); // idempotent

        f.queue
            .add("starships", OperationKind::Insert { data: draft("a") });
        let outcome = f.handle.manual_sync().await;
        assert!(outcome.success);
        assert_eq!(outcome.processed, 1);
    }
}
