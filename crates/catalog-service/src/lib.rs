//! # catalog-service
//!
//! The course catalog service object.
//!
//! [`CatalogService`] is built once at startup and shared by reference with
//! every request handler. It owns the record store, the search engine and
//! the result cache, and exposes:
//!
//! - `search`: cached two-field substring search that never fails
//! - `reload`: atomic replacement of the record store from its source
//! - `stats` / `evaluation_stats`: read-only counts
//! - `key_index` / `prefix_index`: index builds over the current records
//! - `submit_course`: validated append to the submissions file

pub mod catalog;
pub mod error;
pub mod submissions;

pub use catalog::{CatalogService, CatalogStats, EvaluationStats, SearchMetrics};
pub use error::ServiceError;
pub use submissions::SubmissionLog;
