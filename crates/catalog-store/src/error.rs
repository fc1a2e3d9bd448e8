//! Record store error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or writing the tabular source.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be opened, created or written
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file could not be parsed or encoded as CSV
    #[error("CSV error on {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        LoadError::Parse {
            path: path.into(),
            source,
        }
    }
}
