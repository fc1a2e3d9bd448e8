//! Service error types.

use catalog_index::IndexError;
use catalog_store::LoadError;
use catalog_types::{CatalogError, ValidationError};
use thiserror::Error;

/// Errors surfaced by [`crate::CatalogService`].
///
/// Searches never fail; these come from startup, reload, index builds and
/// course submissions.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] CatalogError),

    #[error("Failed to load catalog: {0}")]
    Load(#[from] LoadError),

    #[error("Index build failed: {0}")]
    Index(#[from] IndexError),

    #[error("Invalid course entry: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to record submission: {0}")]
    Submission(#[source] LoadError),

    #[error("Background task failed: {0}")]
    Task(String),
}
