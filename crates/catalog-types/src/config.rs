//! Configuration loading for the course catalog.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/course-catalog/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CatalogError;
use crate::record::FieldSchema;

/// Which cache backing store to use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    /// Process-local map with per-entry expiry (default)
    #[default]
    Memory,
    /// Remote Redis server at `cache.url`
    Redis,
    /// No cache; every search is a live scan
    Disabled,
}

/// Result cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub backend: CacheBackendKind,

    /// Backing store address (used by the redis backend)
    #[serde(default = "default_cache_url")]
    pub url: String,

    /// Lifetime of a cached result set
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Upper bound on any single backing store call (ms).
    /// A call that exceeds it counts as a miss.
    #[serde(default = "default_cache_timeout_ms")]
    pub timeout_ms: u64,

    /// Clear the cache when the service starts
    #[serde(default = "default_true")]
    pub flush_on_startup: bool,

    /// Clear the cache after a successful reload
    #[serde(default = "default_true")]
    pub flush_on_reload: bool,
}

fn default_cache_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_cache_timeout_ms() -> u64 {
    250
}

fn default_true() -> bool {
    true
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::default(),
            url: default_cache_url(),
            ttl_secs: default_cache_ttl_secs(),
            timeout_ms: default_cache_timeout_ms(),
            flush_on_startup: true,
            flush_on_reload: true,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the catalog CSV loaded at startup
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// Path to the CSV that collects submitted courses
    #[serde(default = "default_submissions_path")]
    pub submissions_path: String,

    /// Column holding the course name
    #[serde(default = "default_name_column")]
    pub name_column: String,

    /// Column holding the instructor
    #[serde(default = "default_instructor_column")]
    pub instructor_column: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Result cache configuration
    #[serde(default)]
    pub cache: CacheSettings,
}

fn default_data_path() -> String {
    "./CoursesData.csv".to_string()
}

fn default_submissions_path() -> String {
    "./NewCourses.csv".to_string()
}

fn default_name_column() -> String {
    FieldSchema::default().name_column
}

fn default_instructor_column() -> String {
    FieldSchema::default().instructor_column
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            submissions_path: default_submissions_path(),
            name_column: default_name_column(),
            instructor_column: default_instructor_column(),
            log_level: default_log_level(),
            cache: CacheSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/course-catalog/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (CATALOG_*, nested keys joined with `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, CatalogError> {
        let config_dir = ProjectDirs::from("", "", "course-catalog")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");
        let defaults = Settings::default();

        let mut builder = Config::builder()
            .set_default("data_path", defaults.data_path)
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("submissions_path", defaults.submissions_path)
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("name_column", defaults.name_column)
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("instructor_column", defaults.instructor_column)
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("log_level", defaults.log_level)
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("cache.url", defaults.cache.url)
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("cache.ttl_secs", defaults.cache.ttl_secs as i64)
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("cache.timeout_ms", defaults.cache.timeout_ms as i64)
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: CATALOG_DATA_PATH, CATALOG_CACHE__TTL_SECS, ...
        builder = builder.add_source(
            Environment::with_prefix("CATALOG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| CatalogError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| CatalogError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name_column.trim().is_empty() || self.instructor_column.trim().is_empty() {
            return Err(CatalogError::Config(
                "name_column and instructor_column must not be empty".to_string(),
            ));
        }
        if self.name_column == self.instructor_column {
            return Err(CatalogError::Config(format!(
                "name_column and instructor_column must differ, both are {}",
                self.name_column
            )));
        }
        if self.cache.ttl_secs == 0 {
            return Err(CatalogError::Config("cache.ttl_secs must be > 0".to_string()));
        }
        if self.cache.timeout_ms == 0 {
            return Err(CatalogError::Config(
                "cache.timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Columns holding the typed record fields.
    pub fn field_schema(&self) -> FieldSchema {
        FieldSchema::new(self.name_column.clone(), self.instructor_column.clone())
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_path)
    }

    pub fn submissions_path(&self) -> PathBuf {
        PathBuf::from(&self.submissions_path)
    }
}
