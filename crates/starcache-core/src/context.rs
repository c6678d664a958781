//! One-stop wiring for the offline layer.
//!
//! The embedding application constructs a [`CatalogContext`] once at
//! startup with its backend, storage, and network monitor, then hands
//! references to the UI. Teardown is explicit via `dispose()` (or implicit
//! when the context is dropped).

use std::sync::Arc;

use crate::api::RemoteBackend;
use crate::cache::CacheStore;
use crate::catalog::StarshipCatalog;
use crate::connectivity::NetworkMonitor;
use crate::queue::OperationQueue;
use crate::status::StatusHandle;
use crate::storage::Storage;
use crate::sync::SyncManager;

pub struct CatalogContext {
    catalog: StarshipCatalog,
    status: StatusHandle,
}

impl CatalogContext {
    /// Build the cache, queue, sync manager, catalog, and status observer
    /// over shared handles. Requires a tokio runtime (the status observer
    /// spawns its listener task).
    pub fn new(
        backend: Arc<dyn RemoteBackend>,
        storage: Arc<dyn Storage>,
        monitor: Arc<NetworkMonitor>,
    ) -> Self {
        let cache = CacheStore::new(storage.clone());
        let queue = Arc::new(OperationQueue::new(storage.clone()));
        let sync = Arc::new(SyncManager::new(
            backend.clone(),
            queue.clone(),
            monitor.clone(),
            storage,
        ));
        let catalog = StarshipCatalog::new(backend, cache, queue.clone(), monitor.clone());
        let status = StatusHandle::new(sync, queue, monitor);

        Self { catalog, status }
    }

    pub fn catalog(&self) -> &StarshipCatalog {
        &self.catalog
    }

    pub fn status(&self) -> &StatusHandle {
        &self.status
    }

    /// Stop the status listener. The catalog itself stays usable.
    pub fn dispose(&self) {
        self.status.dispose();
    }
}

// ============================================================================
// Tests
// ============================================================================
