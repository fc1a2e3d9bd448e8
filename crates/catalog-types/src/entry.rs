//! Caller-submitted course entries.
//!
//! New courses are submitted as free-form field maps. They are validated
//! here and appended to the submissions file by the service; they never
//! enter the live record store directly.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::FieldValue;

/// Fields every submitted course must carry, in file column order.
pub const REQUIRED_COURSE_FIELDS: &[&str] = &[
    "course_name",
    "course_attribute",
    "instructor",
    "content",
    "attendance",
    "assessment",
    "grade",
];

/// Grade literal accepted in place of a number.
pub const UNKNOWN_GRADE: &str = "Unknown";

/// Why a submitted course was rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Grade must be between 0 and 100 or 'Unknown', got {0}")]
    InvalidGrade(String),
}

/// A submitted course, as an ordered field map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseEntry {
    pub fields: IndexMap<String, FieldValue>,
}

impl CourseEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Check required fields and the grade range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for field in REQUIRED_COURSE_FIELDS {
            if !self.fields.contains_key(*field) {
                return Err(ValidationError::MissingField(field.to_string()));
            }
        }

        match self.fields.get("grade") {
            Some(FieldValue::Text(grade)) if grade != UNKNOWN_GRADE => {
                match grade.trim().parse::<i64>() {
                    Ok(value) if (0..=100).contains(&value) => Ok(()),
                    _ => Err(ValidationError::InvalidGrade(grade.clone())),
                }
            }
            Some(FieldValue::Number(n)) => {
                if n.fract() == 0.0 && (0.0..=100.0).contains(n) {
                    Ok(())
                } else {
                    Err(ValidationError::InvalidGrade(n.to_string()))
                }
            }
            Some(FieldValue::Bool(b)) => Err(ValidationError::InvalidGrade(b.to_string())),
            _ => Ok(()),
        }
    }
}
