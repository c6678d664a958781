//! Cache key derivation.
//!
//! One key per logical query, so a refetch of the same query always lands
//! on the same entry.

/// Key for the full catalog listing.
pub const ALL_STARSHIPS: &str = "all_starships";

/// Key for a single record by id.
pub fn starship(id: &str) -> String {
    format!("starship_{}", id)
}

/// Key for a faction listing.
pub fn faction(name: &str) -> String {
    format!("faction_{}", name)
}

/// Key for a search result set. Queries are lower-cased so searches that
/// differ only in case share one entry.
pub fn search(query: &str) -> String {
    format!("search_{}", query.to_lowercase())
}
