//! The catalog service object.

use std::path::PathBuf;
use std::sync::Arc;

use catalog_cache::{cache_key, CacheMetricsSnapshot, ResultCache};
use catalog_index::{KeyIndex, PrefixIndex};
use catalog_search::{SearchEngine, SearchQuery};
use catalog_store::{LoadError, RecordStore};
use catalog_types::{CourseEntry, FieldSchema, Record, Settings};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ServiceError;
use crate::submissions::SubmissionLog;

/// Record store counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub record_count: usize,
    pub generation: u64,
    pub loaded_at: DateTime<Utc>,
}

/// Catalog size including pending submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvaluationStats {
    pub evaluation_count: usize,
    pub submitted_count: usize,
}

/// Search path counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMetrics {
    /// Searches answered by scanning the record store
    pub live_scans: u64,
    pub cache: CacheMetricsSnapshot,
}

/// Shared service state. Construct once, pass by reference.
#[derive(Debug)]
pub struct CatalogService {
    settings: Settings,
    schema: FieldSchema,
    store: Arc<RecordStore>,
    engine: SearchEngine,
    cache: ResultCache,
    submissions: SubmissionLog,
}

impl CatalogService {
    /// Start the service from settings.
    ///
    /// Loads the record store (failure is fatal), connects the cache and
    /// flushes it if configured. A cache that cannot be reached is not an
    /// error; the service runs without it.
    pub async fn start(settings: Settings) -> Result<Self, ServiceError> {
        settings.validate()?;

        let store = Arc::new(RecordStore::new());
        load_store(&store, settings.data_path(), settings.field_schema()).await?;

        let cache = ResultCache::from_settings(&settings.cache).await;
        if settings.cache.flush_on_startup {
            cache.flush_all().await;
        }

        let service = Self::new(store, cache, settings);
        info!(
            data_path = %service.settings.data_path,
            records = service.store.len(),
            cache = service.cache.backend_name(),
            "Catalog service started"
        );
        Ok(service)
    }

    /// Assemble a service from parts.
    pub fn new(store: Arc<RecordStore>, cache: ResultCache, settings: Settings) -> Self {
        Self {
            schema: settings.field_schema(),
            submissions: SubmissionLog::new(settings.submissions_path()),
            settings,
            store,
            engine: SearchEngine::new(),
            cache,
        }
    }

    /// Records whose name contains `name` and whose instructor contains
    /// `instructor`, in store order.
    ///
    /// Served from the cache when possible. Never fails: cache problems
    /// fall back to a live scan.
    ///
    /// The cache key carries the generation of the snapshot that is scanned,
    /// so a write that lands after a reload is never read back.
    pub async fn search(&self, name: &str, instructor: &str) -> Vec<Record> {
        let snapshot = self.store.snapshot();
        let key = cache_key(snapshot.generation(), name, instructor);
        if let Some(results) = self.cache.get(&key).await {
            return results;
        }

        let query = SearchQuery::new(name, instructor);
        let results = self.engine.scan(&snapshot, &query);
        self.cache.put(&key, &results).await;
        debug!(
            name,
            instructor,
            generation = snapshot.generation(),
            results = results.len(),
            "Search served live"
        );
        results
    }

    /// Reload the record store from the configured source.
    ///
    /// On failure the previous records stay in place. On success the cache
    /// is flushed if `cache.flush_on_reload` is set. Returns the new count.
    pub async fn reload(&self) -> Result<usize, ServiceError> {
        let count = load_store(&self.store, self.settings.data_path(), self.schema.clone())
            .await
            .inspect_err(|e| warn!(error = %e, "Reload failed, keeping previous records"))?;

        if self.settings.cache.flush_on_reload {
            self.cache.flush_all().await;
        }
        Ok(count)
    }

    pub fn stats(&self) -> CatalogStats {
        let snapshot = self.store.snapshot();
        CatalogStats {
            record_count: snapshot.len(),
            generation: snapshot.generation(),
            loaded_at: snapshot.loaded_at(),
        }
    }

    pub fn evaluation_stats(&self) -> EvaluationStats {
        let submitted_count = self.submissions.count();
        EvaluationStats {
            evaluation_count: self.store.len() + submitted_count,
            submitted_count,
        }
    }

    /// Validate a course and append it to the submissions file.
    ///
    /// Submissions do not enter the live record store.
    pub fn submit_course(&self, entry: &CourseEntry) -> Result<(), ServiceError> {
        self.submissions.submit(entry)
    }

    /// Exact-match index over `column` of the current records.
    pub fn key_index(&self, column: &str) -> Result<KeyIndex, ServiceError> {
        Ok(KeyIndex::build(&self.store, self.schema.key_field(column))?)
    }

    /// Prefix index over `column` of the current records.
    pub fn prefix_index(&self, column: &str) -> Result<PrefixIndex, ServiceError> {
        Ok(PrefixIndex::build(&self.store, self.schema.key_field(column))?)
    }

    /// Clear the result cache. Returns false if the backend failed.
    pub async fn flush_cache(&self) -> bool {
        self.cache.flush_all().await
    }

    pub fn search_metrics(&self) -> SearchMetrics {
        SearchMetrics {
            live_scans: self.engine.scan_count(),
            cache: self.cache.metrics().snapshot(),
        }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

/// Parse on the blocking pool, then swap into `store`.
async fn load_store(
    store: &Arc<RecordStore>,
    path: PathBuf,
    schema: FieldSchema,
) -> Result<usize, ServiceError> {
    let store = Arc::clone(store);
    let loaded: Result<usize, LoadError> =
        tokio::task::spawn_blocking(move || store.load(&path, &schema))
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))?;
    Ok(loaded?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_cache::InMemoryBackend;
    use catalog_index::IndexError;
    use catalog_types::CacheBackendKind;
    use std::time::Duration;
    use tempfile::TempDir;

    const COURSES: &str = "course_name,instructor,credit\n\
                           Algorithms,Lee,3\n\
                           Data Structures,Chen,4\n\
                           Databases,Chen,3\n";

    fn settings_for(temp: &TempDir, content: &str) -> Settings {
        let data = temp.path().join("CoursesData.csv");
        std::fs::write(&data, content).unwrap();

        let mut settings = Settings::default();
        settings.data_path = data.to_string_lossy().to_string();
        settings.submissions_path = temp
            .path()
            .join("NewCourses.csv")
            .to_string_lossy()
            .to_string();
        settings
    }

    fn names(records: &[Record]) -> Vec<&str> {
        records.iter().map(Record::name_str).collect()
    }

    #[tokio::test]
    async fn test_start_loads_store() {
        let temp = TempDir::new().unwrap();
        let service = CatalogService::start(settings_for(&temp, COURSES)).await.unwrap();

        let stats = service.stats();
        assert_eq!(stats.record_count, 3);
        assert_eq!(stats.generation, 1);
        assert_eq!(service.cache().backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_start_fails_without_source() {
        let temp = TempDir::new().unwrap();
        let mut settings = settings_for(&temp, COURSES);
        settings.data_path = temp.path().join("absent.csv").to_string_lossy().to_string();

        let err = CatalogService::start(settings).await.unwrap_err();
        assert!(matches!(err, ServiceError::Load(LoadError::Io { .. })));
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_settings() {
        let temp = TempDir::new().unwrap();
        let mut settings = settings_for(&temp, COURSES);
        settings.cache.ttl_secs = 0;

        let err = CatalogService::start(settings).await.unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }

    #[tokio::test]
    async fn test_search_caches_results() {
        let temp = TempDir::new().unwrap();
        let service = CatalogService::start(settings_for(&temp, COURSES)).await.unwrap();

        let first = service.search("Data", "").await;
        let second = service.search("Data", "").await;
        assert_eq!(first, second);
        assert_eq!(names(&first), vec!["Data Structures", "Databases"]);

        let metrics = service.search_metrics();
        assert_eq!(metrics.live_scans, 1);
        assert_eq!(metrics.cache.hits, 1);
    }

    #[tokio::test]
    async fn test_search_without_cache() {
        let temp = TempDir::new().unwrap();
        let mut settings = settings_for(&temp, COURSES);
        settings.cache.backend = CacheBackendKind::Disabled;
        let service = CatalogService::start(settings).await.unwrap();

        assert_eq!(names(&service.search("", "Chen").await), vec!["Data Structures", "Databases"]);
        assert_eq!(service.search("", "Chen").await.len(), 2);
        assert_eq!(service.search_metrics().live_scans, 2);
    }

    #[tokio::test]
    async fn test_reload_swaps_records_and_flushes_cache() {
        let temp = TempDir::new().unwrap();
        let settings = settings_for(&temp, COURSES);
        let data_path = settings.data_path();
        let service = CatalogService::start(settings).await.unwrap();

        assert_eq!(service.search("", "").await.len(), 3);

        std::fs::write(&data_path, "course_name,instructor\nCompilers,Wu\n").unwrap();
        assert_eq!(service.reload().await.unwrap(), 1);
        assert_eq!(service.stats().generation, 2);

        // Cache was flushed, so the new records are visible immediately
        assert_eq!(names(&service.search("", "").await), vec!["Compilers"]);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_records() {
        let temp = TempDir::new().unwrap();
        let settings = settings_for(&temp, COURSES);
        let data_path = settings.data_path();
        let service = CatalogService::start(settings).await.unwrap();

        std::fs::remove_file(&data_path).unwrap();
        assert!(service.reload().await.is_err());
        assert_eq!(service.stats().record_count, 3);
        assert_eq!(service.stats().generation, 1);
    }

    #[tokio::test]
    async fn test_indexes_over_current_records() {
        let temp = TempDir::new().unwrap();
        let service = CatalogService::start(settings_for(&temp, COURSES)).await.unwrap();

        let by_instructor = service.key_index("instructor").unwrap();
        assert_eq!(
            by_instructor.lookup("Chen").map(Record::name_str),
            Some("Databases")
        );

        let by_name = service.prefix_index("course_name").unwrap();
        assert_eq!(by_name.lookup_prefix("Data").count(), 2);

        let by_credit = service.key_index("credit").unwrap();
        assert_eq!(
            by_credit.lookup("4").map(Record::name_str),
            Some("Data Structures")
        );

        let err = service.key_index("room").unwrap_err();
        assert!(matches!(err, ServiceError::Index(IndexError::MissingField { .. })));
    }

    #[tokio::test]
    async fn test_submissions_count_toward_evaluations() {
        let temp = TempDir::new().unwrap();
        let service = CatalogService::start(settings_for(&temp, COURSES)).await.unwrap();
        assert_eq!(service.evaluation_stats().submitted_count, 0);

        let entry = CourseEntry::new()
            .with("course_name", "Compilers")
            .with("course_attribute", "elective")
            .with("instructor", "Wu")
            .with("content", "parsing")
            .with("attendance", "weekly")
            .with("assessment", "project")
            .with("grade", "Unknown");
        service.submit_course(&entry).unwrap();

        assert_eq!(
            service.evaluation_stats(),
            EvaluationStats {
                evaluation_count: 4,
                submitted_count: 1
            }
        );
        // Submissions stay out of the live store
        assert!(service.search("Compilers", "").await.is_empty());
    }

    #[tokio::test]
    async fn test_injected_memory_backend() {
        let backend = Arc::new(InMemoryBackend::new());
        let cache = ResultCache::new(
            Some(backend.clone()),
            Duration::from_secs(60),
            Duration::from_millis(50),
        );
        let store = Arc::new(RecordStore::from_records(vec![Record::new("Algorithms", "Lee")]));
        let service = CatalogService::new(store, cache, Settings::default());

        service.search("", "Lee").await;
        assert_eq!(backend.len(), 1);

        // Reloading makes the old entry unreachable without a flush
        service.store().replace(vec![Record::new("Compilers", "Lee")]);
        assert_eq!(names(&service.search("", "Lee").await), vec!["Compilers"]);
        assert_eq!(backend.len(), 2);
        assert_eq!(service.search_metrics().live_scans, 2);
    }
}
