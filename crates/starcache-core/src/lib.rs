//! starcache-core - the offline-resilience layer of a starship catalog
//! client.
//!
//! The catalog keeps working when the network goes away: reads come from a
//! timestamped local cache, writes queue up for later, and a sync engine
//! replays the queue against the remote record store once connectivity
//! returns.
//!
//! The pieces, leaf-first:
//!
//! - [`storage`]: string-keyed persistence port (file-backed or in-memory)
//! - [`connectivity`]: online/offline oracle plus transition events
//! - [`cache`]: expiring snapshot cache for fetched data
//! - [`queue`]: durable FIFO log of pending writes
//! - [`api`]: the remote record-store port and its REST implementation
//! - [`sync`]: queue replay with per-operation error isolation
//! - [`status`]: live `{is_online, pending, last_sync, is_syncing}` feed
//! - [`catalog`]: the per-entity read/write facade the UI calls
//! - [`context`]: constructs the whole stack in one call

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod connectivity;
pub mod context;
pub mod models;
pub mod queue;
pub mod status;
pub mod storage;
pub mod sync;

#[cfg(test)]
pub(crate) mod testutil;

pub use api::{BackendError, RemoteBackend, RestBackend, SelectFilter};
pub use cache::CacheStore;
pub use catalog::{StarshipCatalog, STARSHIPS_TABLE};
pub use config::Config;
pub use connectivity::{Connectivity, ConnectivityEvent, NetworkMonitor};
pub use context::CatalogContext;
pub use models::{Starship, StarshipDraft, StarshipPatch};
pub use queue::{OperationKind, OperationQueue, QueuedOperation};
pub use status::{OnlineStatus, StatusHandle};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use sync::{SyncManager, SyncOutcome};
