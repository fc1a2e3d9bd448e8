//! Trie index supporting exact and prefix lookups.
//!
//! Nodes live in a flat arena and are addressed by position. Each node that
//! terminates a key holds the position of the record in the snapshot, and
//! every node lists the positions under it in store order, so a prefix
//! lookup yields its first match without walking the subtree.

use std::collections::BTreeMap;
use std::sync::Arc;

use catalog_store::{RecordStore, StoreSnapshot};
use catalog_types::{KeyField, Record};
use tracing::debug;

use crate::error::IndexError;
use crate::index_key;

const ROOT: usize = 0;

#[derive(Debug, Default)]
struct TrieNode {
    children: BTreeMap<char, usize>,
    slot: Option<usize>,
    /// Live slots at or below this node, ascending
    subtree: Vec<usize>,
}

/// Trie over one field of a store snapshot.
#[derive(Debug)]
pub struct PrefixIndex {
    snapshot: Arc<StoreSnapshot>,
    field: KeyField,
    nodes: Vec<TrieNode>,
    keys: usize,
}

impl PrefixIndex {
    /// Build from the store's current snapshot.
    pub fn build(store: &RecordStore, field: KeyField) -> Result<Self, IndexError> {
        Self::from_snapshot(store.snapshot(), field)
    }

    /// Build from a specific snapshot.
    ///
    /// Same failure conditions as [`crate::KeyIndex::from_snapshot`]. An
    /// exact key inserted twice keeps the later record.
    pub fn from_snapshot(snapshot: Arc<StoreSnapshot>, field: KeyField) -> Result<Self, IndexError> {
        if snapshot.is_empty() {
            return Err(IndexError::EmptyStore);
        }

        let mut index = Self {
            snapshot: Arc::clone(&snapshot),
            field,
            nodes: vec![TrieNode::default()],
            keys: 0,
        };

        let mut overwritten = 0usize;
        for (position, record) in snapshot.records().iter().enumerate() {
            let key = index_key(record, &index.field, position)?;
            if index.insert(key, position) {
                overwritten += 1;
            }
        }

        let mut live: Vec<usize> = index.nodes.iter().filter_map(|node| node.slot).collect();
        live.sort_unstable();
        for position in live {
            let key = index_key(&snapshot.records()[position], &index.field, position)?;
            index.mark_path(key, position);
        }

        debug!(
            field = %index.field,
            keys = index.keys,
            nodes = index.nodes.len(),
            overwritten,
            generation = snapshot.generation(),
            "Built prefix index"
        );
        Ok(index)
    }

    /// Insert `key`. Returns true if it replaced an existing entry.
    fn insert(&mut self, key: &str, position: usize) -> bool {
        let mut node = ROOT;
        for ch in key.chars() {
            let existing = self.nodes[node].children.get(&ch).copied();
            node = match existing {
                Some(next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(ch, next);
                    next
                }
            };
        }

        let replaced = self.nodes[node].slot.replace(position).is_some();
        if !replaced {
            self.keys += 1;
        }
        replaced
    }

    /// Add `position` to the subtree list of every node on `key`'s path.
    /// Positions must arrive in ascending order.
    fn mark_path(&mut self, key: &str, position: usize) {
        let mut node = ROOT;
        self.nodes[node].subtree.push(position);
        for ch in key.chars() {
            let Some(&next) = self.nodes[node].children.get(&ch) else {
                return;
            };
            node = next;
            self.nodes[node].subtree.push(position);
        }
    }

    fn find(&self, prefix: &str) -> Option<usize> {
        let mut node = ROOT;
        for ch in prefix.chars() {
            node = *self.nodes[node].children.get(&ch)?;
        }
        Some(node)
    }

    /// Record stored under exactly `key`.
    pub fn lookup_exact(&self, key: &str) -> Option<&Record> {
        let slot = self.nodes[self.find(key)?].slot?;
        Some(&self.snapshot.records()[slot])
    }

    /// Records whose key starts with `prefix`, in store order.
    ///
    /// An empty prefix matches every indexed record. The iterator is lazy:
    /// finding the start node costs one step per prefix character, and each
    /// match is produced on demand.
    pub fn lookup_prefix(&self, prefix: &str) -> PrefixMatches<'_> {
        let slots: &[usize] = match self.find(prefix) {
            Some(node) => &self.nodes[node].subtree,
            None => &[],
        };
        PrefixMatches {
            records: self.snapshot.records(),
            slots: slots.iter(),
        }
    }

    pub fn field(&self) -> &KeyField {
        &self.field
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys == 0
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

/// Iterator over prefix matches.
#[derive(Debug)]
pub struct PrefixMatches<'a> {
    records: &'a [Record],
    slots: std::slice::Iter<'a, usize>,
}

impl<'a> Iterator for PrefixMatches<'a> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<Self::Item> {
        self.slots.next().map(|&slot| &self.records[slot])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl ExactSizeIterator for PrefixMatches<'_> {}
