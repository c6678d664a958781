//! Durable FIFO log of pending write operations.
//!
//! Writes attempted while offline (or that fail while nominally online)
//! land here and wait for the sync manager to replay them against the
//! remote backend. Order is insertion order and survives process restarts.

pub mod manager;

pub use manager::{OperationKind, OperationQueue, QueuedOperation};
