//! Error types for the course catalog.

use thiserror::Error;

/// Unified error type for catalog configuration.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
