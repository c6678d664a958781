//! Remote record-store client module.
//!
//! The catalog talks to its backend through the [`RemoteBackend`] port:
//! four operations (select/insert/update/delete) over opaque JSON records,
//! addressed by table and id. [`RestBackend`] implements the port against a
//! PostgREST-style HTTP endpoint; tests substitute in-memory fakes.

pub mod backend;
pub mod client;
pub mod error;

pub use backend::{RemoteBackend, SelectFilter};
pub use client::RestBackend;
pub use error::BackendError;
