//! Index build error types.

use thiserror::Error;

/// Errors that can occur while building an index.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// The store snapshot holds no records
    #[error("Cannot build an index over an empty store")]
    EmptyStore,

    /// A record lacks the key field
    #[error("Record {position} is missing key field {field}")]
    MissingField { field: String, position: usize },

    /// A record's key field is not a string
    #[error("Key field {field} of record {position} is {found}, expected text")]
    TypeMismatch {
        field: String,
        position: usize,
        found: &'static str,
    },
}
