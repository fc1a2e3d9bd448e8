//! End-to-end test infrastructure for the course catalog.
//!
//! Provides a shared TestHarness backed by a temporary CSV source, plus
//! fake cache backends for exercising the fail-open paths.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::Notify;

use catalog_cache::{CacheBackend, CacheError, InMemoryBackend, ResultCache};
use catalog_service::CatalogService;
use catalog_store::RecordStore;
use catalog_types::{CacheBackendKind, Record, Settings};

/// Cache TTL used by harness-built services.
pub const TEST_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache call timeout used by harness-built services.
pub const TEST_TIMEOUT: Duration = Duration::from_millis(100);

/// Shared test harness for E2E tests.
///
/// Owns a temp directory holding the catalog source and the submissions
/// file, and builds services over them.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Catalog CSV
    pub data_path: PathBuf,
    /// Submissions CSV (not created until the first submission)
    pub submissions_path: PathBuf,
}

impl TestHarness {
    /// Create a harness with the given catalog rows.
    pub fn new(courses: &[(&str, &str)]) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let data_path = temp_dir.path().join("CoursesData.csv");
        let submissions_path = temp_dir.path().join("NewCourses.csv");

        let harness = Self {
            _temp_dir: temp_dir,
            data_path,
            submissions_path,
        };
        harness.write_courses(courses);
        harness
    }

    /// Replace the catalog source with the given rows.
    pub fn write_courses(&self, courses: &[(&str, &str)]) {
        std::fs::write(&self.data_path, courses_csv(courses)).expect("Failed to write courses");
    }

    /// Replace the catalog source with raw CSV text.
    pub fn write_raw(&self, content: &str) {
        std::fs::write(&self.data_path, content).expect("Failed to write courses");
    }

    /// Settings pointing at the harness files.
    pub fn settings(&self, backend: CacheBackendKind) -> Settings {
        let mut settings = Settings::default();
        settings.data_path = self.data_path.to_string_lossy().to_string();
        settings.submissions_path = self.submissions_path.to_string_lossy().to_string();
        settings.cache.backend = backend;
        settings.cache.ttl_secs = TEST_TTL.as_secs();
        settings.cache.timeout_ms = TEST_TIMEOUT.as_millis() as u64;
        settings
    }

    /// Build a service over the harness source with an injected backend.
    pub fn service_with(&self, backend: Option<Arc<dyn CacheBackend>>) -> CatalogService {
        self.build_service(self.settings(CacheBackendKind::Memory), backend)
    }

    /// Build a service with explicit settings and an injected backend.
    pub fn build_service(
        &self,
        settings: Settings,
        backend: Option<Arc<dyn CacheBackend>>,
    ) -> CatalogService {
        let store = Arc::new(RecordStore::new());
        store
            .load(&self.data_path, &settings.field_schema())
            .expect("Failed to load harness courses");
        let cache = ResultCache::new(backend, settings.cache.ttl(), settings.cache.timeout());
        CatalogService::new(store, cache, settings)
    }
}

/// Render `(name, instructor)` pairs as a catalog CSV.
pub fn courses_csv(courses: &[(&str, &str)]) -> String {
    let mut csv = String::from("course_name,instructor\n");
    for (name, instructor) in courses {
        csv.push_str(name);
        csv.push(',');
        csv.push_str(instructor);
        csv.push('\n');
    }
    csv
}

/// Names of `records`, in order.
pub fn names(records: &[Record]) -> Vec<&str> {
    records.iter().map(Record::name_str).collect()
}

const NAME_PARTS: &[&str] = &[
    "Algorithms",
    "Data Structures",
    "Databases",
    "Operating Systems",
    "Linear Algebra",
    "算法设计",
    "Networks",
];

const INSTRUCTORS: &[&str] = &["Lee", "Chen", "Cheng", "Wu", "王", "Li", ""];

/// Random records drawn from a small vocabulary so filters hit often.
pub fn random_records(count: usize) -> Vec<Record> {
    let mut rng = rand::rng();
    (0..count)
        .map(|i| {
            let name = format!(
                "{} {}",
                NAME_PARTS[rng.random_range(0..NAME_PARTS.len())],
                i % 7
            );
            let instructor = INSTRUCTORS[rng.random_range(0..INSTRUCTORS.len())];
            Record::new(name, instructor)
        })
        .collect()
}

/// Wraps an in-memory backend and counts calls.
#[derive(Default)]
pub struct CountingBackend {
    inner: InMemoryBackend,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub flushes: AtomicUsize,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheBackend for CountingBackend {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner.delete(key).await
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        self.inner.flush_all().await
    }
}

/// Backend whose every call fails as if the server were down.
pub struct FailingBackend;

#[async_trait]
impl CacheBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

/// Backend that answers every call only after `delay`.
pub struct SlowBackend {
    pub delay: Duration,
}

#[async_trait]
impl CacheBackend for SlowBackend {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        tokio::time::sleep(self.delay).await;
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// In-memory backend whose next `set` parks until released.
///
/// Lets a test hold a search between its live scan and its cache write.
pub struct GatedBackend {
    inner: InMemoryBackend,
    armed: AtomicBool,
    /// Signalled when the parked `set` starts waiting
    pub entered: Notify,
    /// Signal to let the parked `set` finish
    pub release: Notify,
}

impl GatedBackend {
    /// A backend that parks the first `set` it sees.
    pub fn new() -> Self {
        Self {
            inner: InMemoryBackend::new(),
            armed: AtomicBool::new(true),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for GatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for GatedBackend {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner.delete(key).await
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        self.inner.flush_all().await
    }
}
