//! # catalog-types
//!
//! Shared domain types for the course catalog.
//!
//! This crate defines the data structures used throughout the system:
//! - Records: immutable catalog entries with typed search fields
//! - Field schema: which columns hold the course name and instructor
//! - Course entries: caller-submitted rows and their validation
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use catalog_types::{FieldSchema, FieldValue, Record};
//!
//! let schema = FieldSchema::default();
//! let record = Record::new("Algorithms", "Lee").with_field("credit", FieldValue::Number(3.0));
//! assert_eq!(record.name_str(), "Algorithms");
//! assert_eq!(record.to_row(&schema).len(), 3);
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod record;

pub use config::{CacheBackendKind, CacheSettings, Settings};
pub use entry::{CourseEntry, ValidationError, REQUIRED_COURSE_FIELDS};
pub use error::CatalogError;
pub use record::{FieldLookup, FieldSchema, FieldValue, KeyField, Record, UNKNOWN_VALUE};
