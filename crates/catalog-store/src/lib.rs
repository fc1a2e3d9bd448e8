//! # catalog-store
//!
//! The canonical in-memory set of catalog records.
//!
//! ## Features
//! - CSV loader tolerant of ragged rows, with missing values normalized
//! - CSV writer and single-row appender for submitted entries
//! - Record store with immutable snapshots swapped under an exclusive lock
//!
//! Readers take the shared lock only long enough to clone the current
//! snapshot handle; a scan over the snapshot never blocks a reload and
//! always observes one complete generation.

pub mod error;
pub mod store;
pub mod tabular;

pub use error::LoadError;
pub use store::{RecordStore, StoreSnapshot};
pub use tabular::{append_row, count_rows, read_records, write_rows};
