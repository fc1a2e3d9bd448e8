//! # catalog-search
//!
//! Linear substring search over a record store snapshot.
//!
//! A record matches when each non-empty filter is a substring of the
//! corresponding field. Matching is case-sensitive and exact: no folding,
//! no normalization. Records missing a field read it as the empty string.
//! Results keep store order; there is no ranking and no limit.

pub mod engine;

pub use engine::{SearchEngine, SearchQuery};
