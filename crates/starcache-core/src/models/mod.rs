//! Data models for catalog entities.
//!
//! The starship record mirrors the remote table's wire format, so the
//! camelCase column names are preserved through serde renames. Three views
//! of the same entity exist:
//!
//! - `Starship`: a full record as the backend returns it
//! - `StarshipDraft`: an insert payload (no id, no creation time)
//! - `StarshipPatch`: a partial update, absent fields untouched

pub mod starship;

pub use starship::{Starship, StarshipDraft, StarshipPatch};
