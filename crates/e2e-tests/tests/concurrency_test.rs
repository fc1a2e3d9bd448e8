//! Reload-under-load E2E tests.
//!
//! Searches running in parallel with repeated reloads must each observe one
//! generation of the store in full: never a mixture of old and new records.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use catalog_search::{SearchEngine, SearchQuery};
use catalog_store::RecordStore;
use catalog_types::{CacheBackendKind, Record};
use e2e_tests::TestHarness;

const OLD_COUNT: usize = 400;
const NEW_COUNT: usize = 250;

fn generation_rows(label: &str, count: usize) -> Vec<(String, String)> {
    (0..count)
        .map(|i| (format!("{} course {}", label, i), label.to_string()))
        .collect()
}

fn as_pairs(rows: &[(String, String)]) -> Vec<(&str, &str)> {
    rows.iter().map(|(n, i)| (n.as_str(), i.as_str())).collect()
}

/// A result is consistent if it is one whole generation.
fn assert_single_generation(results: &[Record]) {
    let instructor = results[0].instructor_str();
    assert!(
        results.iter().all(|r| r.instructor_str() == instructor),
        "result mixes generations"
    );
    let expected = match instructor {
        "Old" => OLD_COUNT,
        "New" => NEW_COUNT,
        other => panic!("unexpected instructor {}", other),
    };
    assert_eq!(results.len(), expected);
    for (i, record) in results.iter().enumerate() {
        assert_eq!(record.name_str(), format!("{} course {}", instructor, i));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_searches_see_whole_generations() {
    // 1. Service without a cache so every search scans
    let old_rows = generation_rows("Old", OLD_COUNT);
    let new_rows = generation_rows("New", NEW_COUNT);
    let harness = TestHarness::new(&as_pairs(&old_rows));
    let service = Arc::new(harness.build_service(harness.settings(CacheBackendKind::Disabled), None));

    // 2. Spawn readers
    let mut readers = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        readers.push(tokio::spawn(async move {
            for _ in 0..50 {
                let results = service.search("", "").await;
                assert_single_generation(&results);
                tokio::task::yield_now().await;
            }
        }));
    }

    // 3. Flip the source back and forth while readers run
    for round in 0..20 {
        let rows = if round % 2 == 0 { &new_rows } else { &old_rows };
        harness.write_courses(&as_pairs(rows));
        service.reload().await.unwrap();
        tokio::task::yield_now().await;
    }

    // 4. Every reader finished without observing a mixture
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(service.stats().generation, 21);
    assert_eq!(service.stats().record_count, OLD_COUNT);
}

#[test]
fn test_threads_scanning_during_replace() {
    let old: Vec<Record> = (0..OLD_COUNT)
        .map(|i| Record::new(format!("Old course {}", i), "Old"))
        .collect();
    let new: Vec<Record> = (0..NEW_COUNT)
        .map(|i| Record::new(format!("New course {}", i), "New"))
        .collect();

    let store = Arc::new(RecordStore::from_records(old.clone()));
    let engine = Arc::new(SearchEngine::new());

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let store = Arc::clone(&store);
            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                for _ in 0..200 {
                    let results = engine.search(&store, &SearchQuery::all());
                    assert_single_generation(&results);
                }
            });
        }

        for round in 0..100 {
            let next = if round % 2 == 0 { new.clone() } else { old.clone() };
            store.replace(next);
        }
    });

    assert_eq!(engine.scan_count(), 800);
    assert_eq!(store.generation(), 101);
}
