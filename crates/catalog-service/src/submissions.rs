//! Append-only log of submitted courses.

use std::path::{Path, PathBuf};

use catalog_store::{append_row, count_rows};
use catalog_types::{CourseEntry, REQUIRED_COURSE_FIELDS};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::ServiceError;

/// CSV file collecting validated course submissions for offline review.
#[derive(Debug)]
pub struct SubmissionLog {
    path: PathBuf,
    // Serializes appends so rows from concurrent submissions never interleave
    write_lock: Mutex<()>,
}

impl SubmissionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate `entry` and append it in required-field order.
    ///
    /// Fields outside the required set are not written.
    pub fn submit(&self, entry: &CourseEntry) -> Result<(), ServiceError> {
        entry.validate()?;

        let _guard = self.write_lock.lock();
        append_row(&self.path, REQUIRED_COURSE_FIELDS, &entry.fields)
            .map_err(ServiceError::Submission)?;

        info!(
            path = %self.path.display(),
            course = %entry.get("course_name").map(|v| v.to_string()).unwrap_or_default(),
            "Recorded course submission"
        );
        Ok(())
    }

    /// Number of submitted rows. Zero if the file is absent or unreadable.
    pub fn count(&self) -> usize {
        if !self.path.exists() {
            return 0;
        }
        match count_rows(&self.path) {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "Could not count submissions");
                0
            }
        }
    }
}
