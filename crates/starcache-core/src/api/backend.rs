use async_trait::async_trait;
use serde_json::Value;

use super::BackendError;

/// Row filter for `select`. The three shapes cover every query the catalog
/// issues: full listings, equality on a single column (faction, id), and
/// the case-insensitive substring OR-match across the searchable columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectFilter {
    All,
    Eq { column: String, value: String },
    IlikeAny { columns: Vec<String>, pattern: String },
}

impl SelectFilter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        SelectFilter::Eq {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// The remote record store.
///
/// Records are opaque JSON objects; the catalog layer owns the typed view.
/// Every method maps a failure to [`BackendError`] and performs no retries;
/// retry policy belongs to the queue/sync layer above.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Fetch the rows of `table` matching `filter`.
    async fn select(&self, table: &str, filter: &SelectFilter) -> Result<Vec<Value>, BackendError>;

    /// Insert `record` and return the stored row (with server-assigned
    /// columns filled in).
    async fn insert(&self, table: &str, record: Value) -> Result<Value, BackendError>;

    /// Patch the row with the given id and return the updated row.
    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, BackendError>;

    /// Delete the row with the given id.
    async fn delete(&self, table: &str, id: &str) -> Result<(), BackendError>;
}
