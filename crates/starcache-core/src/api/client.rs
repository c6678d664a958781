//! HTTP implementation of the remote record-store port.
//!
//! Speaks the PostgREST dialect: equality filters as `?col=eq.value`,
//! multi-column search as `?or=(col.ilike.*q*,...)`, writes returning the
//! affected rows via `Prefer: return=representation`.

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use super::{BackendError, RemoteBackend, SelectFilter};

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough that a hung
/// call cannot stall a sync drain indefinitely.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// REST client for the record store.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestBackend {
    /// Create a client for the REST root, e.g. `https://host/rest/v1`.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match self.api_key {
            Some(ref key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    /// Check if response is successful, mapping failures through
    /// `BackendError::from_status` with the (truncated) body attached.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, "Backend request failed");
        Err(BackendError::from_status(status, &body))
    }

    /// Writes ask for the affected rows back; the store answers with a
    /// one-element array.
    fn first_row(mut rows: Vec<Value>, operation: &str) -> Result<Value, BackendError> {
        if rows.is_empty() {
            return Err(BackendError::InvalidResponse(format!(
                "{} returned no rows",
                operation
            )));
        }
        Ok(rows.remove(0))
    }
}

/// Render the PostgREST `or=(...)` clause for a multi-column ilike search.
fn or_clause(columns: &[String], pattern: &str) -> String {
    let clauses: Vec<String> = columns
        .iter()
        .map(|column| format!("{}.ilike.*{}*", column, pattern))
        .collect();
    format!("({})", clauses.join(","))
}

#[async_trait]
impl RemoteBackend for RestBackend {
    async fn select(&self, table: &str, filter: &SelectFilter) -> Result<Vec<Value>, BackendError> {
        let request = self.client.get(self.table_url(table));
        let request = match filter {
            SelectFilter::All => request,
            SelectFilter::Eq { column, value } => {
                request.query(&[(column.as_str(), format!("eq.{}", value))])
            }
            SelectFilter::IlikeAny { columns, pattern } => {
                request.query(&[("or", or_clause(columns, pattern))])
            }
        };

        debug!(table, ?filter, "select");
        let response = self.with_auth(request).send().await?;
        let response = Self::check_response(response).await?;
        Ok(response.json().await?)
    }

    async fn insert(&self, table: &str, record: Value) -> Result<Value, BackendError> {
        debug!(table, "insert");
        let request = self
            .client
            .post(self.table_url(table))
            .header(header::CONTENT_TYPE, "application/json")
            .header("Prefer", "return=representation")
            .json(&record);

        let response = self.with_auth(request).send().await?;
        let response = Self::check_response(response).await?;
        let rows: Vec<Value> = response.json().await?;
        Self::first_row(rows, "insert")
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, BackendError> {
        debug!(table, id, "update");
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&[("id", format!("eq.{}", id))])
            .header(header::CONTENT_TYPE, "application/json")
            .header("Prefer", "return=representation")
            .json(&patch);

        let response = self.with_auth(request).send().await?;
        let response = Self::check_response(response).await?;
        let rows: Vec<Value> = response.json().await?;
        Self::first_row(rows, "update")
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), BackendError> {
        debug!(table, id, "delete");
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&[("id", format!("eq.{}", id))]);

        let response = self.with_auth(request).send().await?;
        Self::check_response(response).await?;
        Ok(())
    }
}
