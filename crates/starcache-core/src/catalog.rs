//! Per-entity read/write API composing cache, queue, backend, and
//! connectivity.
//!
//! Reads are cache-first: online they refresh the cache and fall back to a
//! stale entry when the backend errors; offline they serve the cache or
//! degrade to empty. Writes are queue-first: offline they enqueue for later
//! replay and patch the cache optimistically so subsequent reads see the
//! pending change; online failures are queued for eventual delivery *and*
//! surfaced to the caller.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::api::{BackendError, RemoteBackend, SelectFilter};
use crate::cache::{keys, CacheStore};
use crate::connectivity::Connectivity;
use crate::models::{Starship, StarshipDraft, StarshipPatch};
use crate::queue::{OperationKind, OperationQueue};

/// The remote table all catalog operations target.
pub const STARSHIPS_TABLE: &str = "starships";

/// Columns covered by free-text search, in wire casing.
const SEARCH_COLUMNS: [&str; 4] = ["name", "faction", "corporation", "shipClass"];

/// Prefix for synthetic ids assigned to offline inserts. The replayed
/// insert gets a server id; the temp id only ever lives in the local cache.
const TEMP_ID_PREFIX: &str = "temp_";

#[derive(Clone)]
pub struct StarshipCatalog {
    backend: Arc<dyn RemoteBackend>,
    cache: CacheStore,
    queue: Arc<OperationQueue>,
    connectivity: Arc<dyn Connectivity>,
}

impl StarshipCatalog {
    pub fn new(
        backend: Arc<dyn RemoteBackend>,
        cache: CacheStore,
        queue: Arc<OperationQueue>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            backend,
            cache,
            queue,
            connectivity,
        }
    }

    // ===== Reads =====

    pub async fn get_all_starships(&self) -> Vec<Starship> {
        self.list(keys::ALL_STARSHIPS, &SelectFilter::All).await
    }

    pub async fn get_by_faction(&self, faction: &str) -> Vec<Starship> {
        self.list(
            &keys::faction(faction),
            &SelectFilter::eq("faction", faction),
        )
        .await
    }

    /// Single-record lookup. Offline (or when the backend has no such row
    /// and errors out) this serves whatever the detail cache holds.
    pub async fn get_by_id(&self, id: &str) -> Option<Starship> {
        let cache_key = keys::starship(id);

        if !self.connectivity.is_online() {
            return self.cache.get(&cache_key);
        }

        match self
            .backend
            .select(STARSHIPS_TABLE, &SelectFilter::eq("id", id))
            .await
        {
            Ok(rows) => match rows.into_iter().next().and_then(parse_row) {
                Some(ship) => {
                    self.cache.set(&cache_key, &ship);
                    Some(ship)
                }
                None => self.cache.get(&cache_key),
            },
            Err(e) => {
                warn!(id, error = %e, "Backend lookup failed, falling back to cache");
                self.cache.get(&cache_key)
            }
        }
    }

    /// Free-text search across name, faction, corporation, and ship class.
    ///
    /// Offline, a previously cached result set for the same (lower-cased)
    /// query is served directly; failing that, the full listing cache is
    /// filtered client-side.
    pub async fn search(&self, query: &str) -> Vec<Starship> {
        let cache_key = keys::search(query);

        if !self.connectivity.is_online() {
            if let Some(cached) = self.cache.get::<Vec<Starship>>(&cache_key) {
                debug!(query, "Serving cached search results offline");
                return cached;
            }
            if let Some(all) = self.cache.get::<Vec<Starship>>(keys::ALL_STARSHIPS) {
                return all.into_iter().filter(|s| s.matches_query(query)).collect();
            }
            return Vec::new();
        }

        let filter = SelectFilter::IlikeAny {
            columns: SEARCH_COLUMNS.iter().map(|c| c.to_string()).collect(),
            pattern: query.to_string(),
        };
        match self.fetch_list(&filter).await {
            Ok(ships) => {
                self.cache.set(&cache_key, &ships);
                ships
            }
            Err(e) => {
                warn!(query, error = %e, "Backend search failed, falling back to cache");
                self.cache.get(&cache_key).unwrap_or_default()
            }
        }
    }

    async fn list(&self, cache_key: &str, filter: &SelectFilter) -> Vec<Starship> {
        if !self.connectivity.is_online() {
            match self.cache.get::<Vec<Starship>>(cache_key) {
                Some(ships) => {
                    debug!(key = %cache_key, "Serving cached data offline");
                    ships
                }
                None => {
                    warn!(key = %cache_key, "No cached data available offline");
                    Vec::new()
                }
            }
        } else {
            match self.fetch_list(filter).await {
                Ok(ships) => {
                    self.cache.set(cache_key, &ships);
                    ships
                }
                Err(e) => {
                    warn!(key = %cache_key, error = %e, "Backend read failed, falling back to cache");
                    self.cache.get(cache_key).unwrap_or_default()
                }
            }
        }
    }

    async fn fetch_list(&self, filter: &SelectFilter) -> Result<Vec<Starship>, BackendError> {
        let rows = self.backend.select(STARSHIPS_TABLE, filter).await?;
        Ok(rows.into_iter().filter_map(parse_row).collect())
    }

    // ===== Writes =====

    /// Insert a starship.
    ///
    /// Offline: queues the insert and appends a synthetic record (temp id,
    /// placeholder creation time) to the listing cache so it shows up
    /// immediately; returns that synthetic record.
    ///
    /// Online failure: the insert is queued for replay and the error is
    /// still returned, so the caller can tell the save did not land yet.
    pub async fn add_starship(&self, draft: StarshipDraft) -> Result<Starship, BackendError> {
        if !self.connectivity.is_online() {
            debug!("Offline: queueing insert");
            self.queue.add(
                STARSHIPS_TABLE,
                OperationKind::Insert {
                    data: draft.clone(),
                },
            );

            let temp_id = format!("{}{}", TEMP_ID_PREFIX, Utc::now().timestamp_millis());
            let ship = draft.into_starship(temp_id);
            let mut all: Vec<Starship> = self.cache.get(keys::ALL_STARSHIPS).unwrap_or_default();
            all.push(ship.clone());
            self.cache.set(keys::ALL_STARSHIPS, &all);
            return Ok(ship);
        }

        match self.backend.insert(STARSHIPS_TABLE, to_payload(&draft)?).await {
            Ok(row) => {
                // Force the next read to refetch rather than patching stale
                // listings locally
                self.cache.remove(keys::ALL_STARSHIPS);
                if let Some(ref faction) = draft.faction {
                    self.cache.remove(&keys::faction(faction));
                }
                parse_row(row).ok_or_else(|| {
                    BackendError::InvalidResponse("insert returned an unreadable row".to_string())
                })
            }
            Err(e) => {
                warn!(error = %e, "Insert failed, queueing for later");
                self.queue
                    .add(STARSHIPS_TABLE, OperationKind::Insert { data: draft });
                Err(e)
            }
        }
    }

    /// Patch a starship by id.
    ///
    /// Offline: queues the update, merges the patch into the cached detail
    /// record when one exists (returning the merge), otherwise returns the
    /// patch projected onto an empty record with the id set.
    pub async fn update_starship(
        &self,
        id: &str,
        patch: StarshipPatch,
    ) -> Result<Starship, BackendError> {
        if !self.connectivity.is_online() {
            debug!(id, "Offline: queueing update");
            self.queue.add(
                STARSHIPS_TABLE,
                OperationKind::Update {
                    record_id: id.to_string(),
                    data: patch.clone(),
                },
            );

            let cache_key = keys::starship(id);
            if let Some(mut ship) = self.cache.get::<Starship>(&cache_key) {
                patch.apply_to(&mut ship);
                self.cache.set(&cache_key, &ship);
                return Ok(ship);
            }
            return Ok(patch.into_starship(id));
        }

        match self
            .backend
            .update(STARSHIPS_TABLE, id, to_payload(&patch)?)
            .await
        {
            Ok(row) => {
                self.cache.remove(&keys::starship(id));
                self.cache.remove(keys::ALL_STARSHIPS);
                parse_row(row).ok_or_else(|| {
                    BackendError::InvalidResponse("update returned an unreadable row".to_string())
                })
            }
            Err(e) => {
                warn!(id, error = %e, "Update failed, queueing for later");
                self.queue.add(
                    STARSHIPS_TABLE,
                    OperationKind::Update {
                        record_id: id.to_string(),
                        data: patch,
                    },
                );
                Err(e)
            }
        }
    }

    /// Delete a starship by id.
    pub async fn delete_starship(&self, id: &str) -> Result<(), BackendError> {
        if !self.connectivity.is_online() {
            debug!(id, "Offline: queueing delete");
            self.queue.add(
                STARSHIPS_TABLE,
                OperationKind::Delete {
                    record_id: id.to_string(),
                },
            );

            self.cache.remove(&keys::starship(id));
            if let Some(all) = self.cache.get::<Vec<Starship>>(keys::ALL_STARSHIPS) {
                let filtered: Vec<Starship> = all.into_iter().filter(|s| s.id != id).collect();
                self.cache.set(keys::ALL_STARSHIPS, &filtered);
            }
            return Ok(());
        }

        match self.backend.delete(STARSHIPS_TABLE, id).await {
            Ok(()) => {
                self.cache.remove(&keys::starship(id));
                self.cache.remove(keys::ALL_STARSHIPS);
                Ok(())
            }
            Err(e) => {
                warn!(id, error = %e, "Delete failed, queueing for later");
                self.queue.add(
                    STARSHIPS_TABLE,
                    OperationKind::Delete {
                        record_id: id.to_string(),
                    },
                );
                Err(e)
            }
        }
    }
}

fn parse_row(row: serde_json::Value) -> Option<Starship> {
    match serde_json::from_value(row) {
        Ok(ship) => Some(ship),
        Err(e) => {
            debug!(error = %e, "Skipping unreadable row");
            None
        }
    }
}

fn to_payload<T: serde::Serialize>(data: &T) -> Result<serde_json::Value, BackendError> {
    serde_json::to_value(data)
        .map_err(|e| BackendError::InvalidResponse(format!("Unserializable payload: {}", e)))
}

// ============================================================================
// Tests
// ============================================================================
