//! Exact-match index.

use std::collections::HashMap;
use std::sync::Arc;

use catalog_store::{RecordStore, StoreSnapshot};
use catalog_types::{KeyField, Record};
use tracing::debug;

use crate::error::IndexError;
use crate::index_key;

/// Map from a field's exact value to the record bearing it.
#[derive(Debug)]
pub struct KeyIndex {
    snapshot: Arc<StoreSnapshot>,
    field: KeyField,
    slots: HashMap<String, usize>,
}

impl KeyIndex {
    /// Build from the store's current snapshot.
    pub fn build(store: &RecordStore, field: KeyField) -> Result<Self, IndexError> {
        Self::from_snapshot(store.snapshot(), field)
    }

    /// Build from a specific snapshot in one pass.
    ///
    /// Fails on the first record that lacks the field or holds a non-text
    /// value. Duplicate values keep the last record.
    pub fn from_snapshot(snapshot: Arc<StoreSnapshot>, field: KeyField) -> Result<Self, IndexError> {
        if snapshot.is_empty() {
            return Err(IndexError::EmptyStore);
        }

        let mut slots = HashMap::with_capacity(snapshot.len());
        let mut overwritten = 0usize;
        for (position, record) in snapshot.records().iter().enumerate() {
            let key = index_key(record, &field, position)?;
            if slots.insert(key.to_string(), position).is_some() {
                overwritten += 1;
            }
        }

        debug!(
            field = %field,
            keys = slots.len(),
            overwritten,
            generation = snapshot.generation(),
            "Built key index"
        );

        Ok(Self {
            snapshot,
            field,
            slots,
        })
    }

    /// Record stored under `key`, if any.
    pub fn lookup(&self, key: &str) -> Option<&Record> {
        self.slots
            .get(key)
            .map(|&position| &self.snapshot.records()[position])
    }

    pub fn field(&self) -> &KeyField {
        &self.field
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store generation this index was built from.
    pub fn generation(&self) -> u64 {
        self.snapshot.generation()
    }

    /// Whether the store has been reloaded since this index was built.
    pub fn is_stale(&self, store: &RecordStore) -> bool {
        store.generation() != self.generation()
    }
}
