//! Substring search engine.

use std::sync::atomic::{AtomicU64, Ordering};

use catalog_store::{RecordStore, StoreSnapshot};
use catalog_types::Record;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A two-field filter. Empty filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Substring required in the course name
    pub name: String,
    /// Substring required in the instructor
    pub instructor: String,
}

impl SearchQuery {
    pub fn new(name: impl Into<String>, instructor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructor: instructor.into(),
        }
    }

    /// Query that returns the whole store.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self::new(name, "")
    }

    pub fn by_instructor(instructor: impl Into<String>) -> Self {
        Self::new("", instructor)
    }

    pub fn is_match_all(&self) -> bool {
        self.name.is_empty() && self.instructor.is_empty()
    }

    #[inline]
    pub fn matches(&self, record: &Record) -> bool {
        (self.name.is_empty() || record.name_str().contains(self.name.as_str()))
            && (self.instructor.is_empty()
                || record.instructor_str().contains(self.instructor.as_str()))
    }

    /// Matching records from a slice, in slice order.
    pub fn filter(&self, records: &[Record]) -> Vec<Record> {
        if self.is_match_all() {
            return records.to_vec();
        }
        records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }
}

/// Executes queries against a record store and counts live scans.
#[derive(Debug, Default)]
pub struct SearchEngine {
    scans: AtomicU64,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan the store's current generation.
    ///
    /// The whole scan runs over one snapshot, so a concurrent reload is
    /// never observed halfway through.
    pub fn search(&self, store: &RecordStore, query: &SearchQuery) -> Vec<Record> {
        self.scan(&store.snapshot(), query)
    }

    /// Scan a snapshot the caller already holds.
    ///
    /// Callers that key anything off the generation take the snapshot first
    /// so the key and the results agree.
    pub fn scan(&self, snapshot: &StoreSnapshot, query: &SearchQuery) -> Vec<Record> {
        self.scans.fetch_add(1, Ordering::Relaxed);

        let results = query.filter(snapshot.records());
        debug!(
            name = %query.name,
            instructor = %query.instructor,
            scanned = snapshot.len(),
            matched = results.len(),
            generation = snapshot.generation(),
            "Live scan completed"
        );
        results
    }

    /// Number of live scans run so far.
    ///
    /// Relaxed counter for tests and metrics, not a synchronization point.
    pub fn scan_count(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn store() -> RecordStore {
        RecordStore::from_records(vec![
            Record::new("Algorithms", "Lee"),
            Record::new("Data Structures", "Chen"),
        ])
    }

    #[test]
    fn test_name_filter() {
        let results = SearchEngine::new().search(&store(), &SearchQuery::by_name("Algo"));
        assert_eq!(results, vec![Record::new("Algorithms", "Lee")]);
    }

    #[test]
    fn test_instructor_filter() {
        let results = SearchEngine::new().search(&store(), &SearchQuery::by_instructor("Ch"));
        assert_eq!(results, vec![Record::new("Data Structures", "Chen")]);
    }

    #[test]
    fn test_no_match() {
        let results = SearchEngine::new().search(&store(), &SearchQuery::by_name("zzz"));
        assert!(results.is_empty());
    }

    #[test]
    fn test_empty_filters_return_everything_in_order() {
        let store = store();
        let results = SearchEngine::new().search(&store, &SearchQuery::all());
        assert_eq!(results, store.snapshot().records().to_vec());
    }

    #[test]
    fn test_both_filters_must_match() {
        let store = store();
        let engine = SearchEngine::new();
        assert_eq!(engine.search(&store, &SearchQuery::new("Data", "Chen")).len(), 1);
        assert!(engine.search(&store, &SearchQuery::new("Data", "Lee")).is_empty());
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let results = SearchEngine::new().search(&store(), &SearchQuery::by_name("algo"));
        assert!(results.is_empty());
    }

    #[test]
    fn test_missing_fields_read_as_empty() {
        let mut nameless = Record::new("", "Lee");
        nameless.name = None;
        let store = RecordStore::from_records(vec![nameless.clone()]);
        let engine = SearchEngine::new();

        assert!(engine.search(&store, &SearchQuery::by_name("A")).is_empty());
        assert_eq!(engine.search(&store, &SearchQuery::by_instructor("Lee")), vec![nameless]);
    }

    #[test]
    fn test_scan_counter() {
        let store = store();
        let engine = SearchEngine::new();
        engine.search(&store, &SearchQuery::all());
        engine.search(&store, &SearchQuery::by_name("x"));
        assert_eq!(engine.scan_count(), 2);
    }

    #[test]
    fn test_scan_uses_held_snapshot() {
        let store = store();
        let held = store.snapshot();
        store.replace(vec![Record::new("Compilers", "Wu")]);

        let engine = SearchEngine::new();
        let results = engine.scan(&held, &SearchQuery::all());
        assert_eq!(held.generation(), 1);
        assert_eq!(results.len(), 2);
        assert_eq!(engine.search(&store, &SearchQuery::all()).len(), 1);
        assert_eq!(engine.scan_count(), 2);
    }

    #[test]
    fn test_results_are_sound_and_complete() {
        let names = ["Algorithms", "Data Structures", "Databases", "Linear Algebra", "数据结构"];
        let instructors = ["Lee", "Chen", "Cheng", "王", "Li"];
        let mut rng = rand::rng();

        let records: Vec<Record> = (0..200)
            .map(|_| {
                Record::new(
                    names[rng.random_range(0..names.len())],
                    instructors[rng.random_range(0..instructors.len())],
                )
            })
            .collect();
        let store = RecordStore::from_records(records.clone());
        let engine = SearchEngine::new();

        for (name, instructor) in [("Data", ""), ("", "Che"), ("a", "L"), ("数据", "王"), ("", "")] {
            let query = SearchQuery::new(name, instructor);
            let results = engine.search(&store, &query);

            let expected: Vec<Record> = records
                .iter()
                .filter(|r| r.name_str().contains(name) && r.instructor_str().contains(instructor))
                .cloned()
                .collect();
            assert_eq!(results, expected, "query {:?}", query);
        }
    }
}
