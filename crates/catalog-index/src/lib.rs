//! # catalog-index
//!
//! Lookup structures built on demand from a record store snapshot.
//!
//! - [`KeyIndex`]: hash map from a field's exact value to its record
//! - [`PrefixIndex`]: trie over a field's value supporting exact and prefix
//!   (autocomplete) lookups
//!
//! Both hold the snapshot they were built from and resolve hits to records
//! in that snapshot by position; nothing is copied. Neither follows later
//! reloads: check [`KeyIndex::is_stale`] / [`PrefixIndex::is_stale`] and
//! rebuild.
//!
//! When two records share a key value the later one wins, in both indexes.

pub mod error;
pub mod key_index;
pub mod prefix_index;

pub use error::IndexError;
pub use key_index::KeyIndex;
pub use prefix_index::{PrefixIndex, PrefixMatches};

use catalog_types::{FieldLookup, KeyField, Record};

/// Extract the string a record is indexed under.
pub(crate) fn index_key<'a>(
    record: &'a Record,
    field: &KeyField,
    position: usize,
) -> Result<&'a str, IndexError> {
    match record.lookup(field) {
        FieldLookup::Text(key) => Ok(key),
        FieldLookup::Missing => Err(IndexError::MissingField {
            field: field.to_string(),
            position,
        }),
        FieldLookup::NotText(value) => Err(IndexError::TypeMismatch {
            field: field.to_string(),
            position,
            found: value.type_name(),
        }),
    }
}
