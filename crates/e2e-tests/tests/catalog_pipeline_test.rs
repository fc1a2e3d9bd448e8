//! Source-to-answer pipeline tests.
//!
//! Loads realistic CSV sources (ragged rows, BOM, pass-through columns),
//! searches and indexes them, and records course submissions.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use catalog_cache::InMemoryBackend;
use catalog_index::IndexError;
use catalog_service::{CatalogService, EvaluationStats, ServiceError};
use catalog_types::{CacheBackendKind, CourseEntry, FieldValue, Record, UNKNOWN_VALUE};
use e2e_tests::{names, TestHarness};

const SOURCE: &str = "\u{feff}course_name,instructor,credit,term\n\
                      Algorithms,Lee,3,Fall\n\
                      Data Structures,Chen,4\n\
                      Databases,,3,Spring,overflow\n\
                      算法设计,王,2,Fall\n";

fn harness() -> TestHarness {
    let harness = TestHarness::new(&[]);
    harness.write_raw(SOURCE);
    harness
}

#[tokio::test]
async fn test_load_normalizes_ragged_rows() {
    // 1. Start from the raw source
    let harness = harness();
    let service = CatalogService::start(harness.settings(CacheBackendKind::Memory))
        .await
        .unwrap();
    assert_eq!(service.stats().record_count, 4);

    // 2. Short row gets "unknown" for the missing column
    let data = service.search("Data Structures", "").await;
    assert_eq!(data[0].extra.get("term"), Some(&FieldValue::text(UNKNOWN_VALUE)));

    // 3. Empty instructor cell reads as "unknown"; overflow cell dropped
    let databases = service.search("Databases", "").await;
    assert_eq!(databases[0].instructor_str(), UNKNOWN_VALUE);
    assert_eq!(databases[0].extra.len(), 2);

    // 4. Unicode filters work byte-exact
    assert_eq!(names(&service.search("算法", "王").await), vec!["算法设计"]);
}

#[tokio::test]
async fn test_indexes_over_loaded_source() {
    let harness = harness();
    let service = harness.service_with(Some(Arc::new(InMemoryBackend::new())));

    // Exact lookup on a pass-through column: last "3" wins
    let by_credit = service.key_index("credit").unwrap();
    assert_eq!(by_credit.lookup("3").map(Record::name_str), Some("Databases"));

    // Autocomplete on the name column
    let by_name = service.prefix_index("course_name").unwrap();
    let completions: Vec<&str> = by_name.lookup_prefix("Data").map(Record::name_str).collect();
    assert_eq!(completions, vec!["Data Structures", "Databases"]);
    assert!(by_name.lookup_exact("Data").is_none());

    // Index goes stale once the source is reloaded
    harness.write_raw("course_name,instructor\nNetworks,Wu\n");
    service.reload().await.unwrap();
    assert!(by_name.is_stale(service.store()));
    assert_eq!(by_name.lookup_prefix("Data").count(), 2);
    assert!(service.prefix_index("course_name").unwrap().lookup_prefix("Data").next().is_none());

    // A column that not every record has cannot be indexed
    let err = service.key_index("credit").unwrap_err();
    assert!(matches!(err, ServiceError::Index(IndexError::MissingField { .. })));
}

#[tokio::test]
async fn test_invalid_utf8_source_still_starts() {
    let harness = TestHarness::new(&[]);
    std::fs::write(
        &harness.data_path,
        b"course_name,instructor\nAlgorithms,Lee\nNetworks,W\xffu\n",
    )
    .unwrap();

    let service = CatalogService::start(harness.settings(CacheBackendKind::Memory))
        .await
        .unwrap();
    assert_eq!(service.stats().record_count, 2);
    assert_eq!(names(&service.search("", "W").await), vec!["Networks"]);
    assert_eq!(names(&service.search("", "Lee").await), vec!["Algorithms"]);
}

#[tokio::test]
async fn test_header_only_source_loads_empty_store() {
    let harness = TestHarness::new(&[]);
    let service = CatalogService::start(harness.settings(CacheBackendKind::Memory))
        .await
        .unwrap();

    assert_eq!(service.stats().record_count, 0);
    assert!(service.search("", "").await.is_empty());
    assert!(matches!(
        service.key_index("course_name").unwrap_err(),
        ServiceError::Index(IndexError::EmptyStore)
    ));
}

#[tokio::test]
async fn test_submissions_are_logged_not_served() {
    // 1. Submit two courses, one with a numeric grade
    let harness = harness();
    let service = harness.service_with(None);
    let course = |name: &str, grade: FieldValue| {
        CourseEntry::new()
            .with("course_name", name)
            .with("course_attribute", "core")
            .with("instructor", "Wu")
            .with("content", "theory")
            .with("attendance", "optional")
            .with("assessment", "exam")
            .with("grade", grade)
    };
    service
        .submit_course(&course("Networks", FieldValue::text("Unknown")))
        .unwrap();
    service
        .submit_course(&course("Compilers", FieldValue::Number(72.0)))
        .unwrap();

    // 2. Invalid grades are rejected and not written
    let err = service
        .submit_course(&course("Quantum", FieldValue::Number(72.5)))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    // 3. Counts include submissions; searches do not
    assert_eq!(
        service.evaluation_stats(),
        EvaluationStats {
            evaluation_count: 6,
            submitted_count: 2
        }
    );
    assert!(service.search("Networks", "").await.is_empty());

    let log = std::fs::read_to_string(&harness.submissions_path).unwrap();
    assert_eq!(log.lines().count(), 3);
    assert!(log.lines().nth(2).unwrap().ends_with(",72"));
}
