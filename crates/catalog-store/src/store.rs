//! The record store.
//!
//! Holds the current generation of records behind a reader/writer lock. The
//! lock guards only the snapshot handle: readers clone the `Arc` under the
//! shared lock and iterate without holding it, writers build the replacement
//! outside the lock and swap it in under the exclusive lock.

use std::path::Path;
use std::sync::Arc;

use catalog_types::{FieldSchema, Record};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::info;

use crate::error::LoadError;
use crate::tabular::read_records;

/// One immutable generation of the record store.
#[derive(Debug)]
pub struct StoreSnapshot {
    records: Vec<Record>,
    generation: u64,
    loaded_at: DateTime<Utc>,
}

impl StoreSnapshot {
    fn new(records: Vec<Record>, generation: u64) -> Self {
        Self {
            records,
            generation,
            loaded_at: Utc::now(),
        }
    }

    /// Records in load order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Generation number, incremented on every replacement.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Canonical in-memory set of catalog records.
#[derive(Debug)]
pub struct RecordStore {
    current: RwLock<Arc<StoreSnapshot>>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    /// Create an empty store (generation 0).
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(StoreSnapshot::new(Vec::new(), 0))),
        }
    }

    /// Create a store holding the given records (generation 1).
    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            current: RwLock::new(Arc::new(StoreSnapshot::new(records, 1))),
        }
    }

    /// Parse `source` and replace the current records with its contents.
    ///
    /// Parsing happens before the exclusive lock is taken; on failure the
    /// current generation is left in place. Returns the new record count.
    pub fn load(&self, source: &Path, schema: &FieldSchema) -> Result<usize, LoadError> {
        let records = read_records(source, schema)?;
        let count = records.len();
        let generation = self.replace(records);
        info!(
            path = %source.display(),
            records = count,
            generation,
            "Loaded record store"
        );
        Ok(count)
    }

    /// Swap in a new generation. Returns its generation number.
    pub fn replace(&self, records: Vec<Record>) -> u64 {
        let mut current = self.current.write();
        let generation = current.generation + 1;
        *current = Arc::new(StoreSnapshot::new(records, generation));
        generation
    }

    /// The current generation, for read-only use.
    ///
    /// The returned snapshot stays valid and unchanged for as long as the
    /// caller holds it, even across a concurrent reload.
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Number of records in the current generation.
    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }
}
