//! Catalog record types.
//!
//! A record is one catalog entry (a course). The two fields the search path
//! reads, the course name and the instructor, are lifted out of the source row
//! into typed slots. Every other column is carried through untouched in
//! `extra`, in source column order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel stored in place of a missing or empty scalar value.
pub const UNKNOWN_VALUE: &str = "unknown";

/// A scalar field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Build a text value.
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// The sentinel used for missing values.
    pub fn unknown() -> Self {
        FieldValue::Text(UNKNOWN_VALUE.to_string())
    }

    /// Borrow the string content if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the variant, used in type mismatch reports.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "bool",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

/// Which source columns hold the typed record fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Column holding the course name
    pub name_column: String,

    /// Column holding the instructor
    pub instructor_column: String,
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self {
            name_column: "course_name".to_string(),
            instructor_column: "instructor".to_string(),
        }
    }
}

impl FieldSchema {
    /// Create a schema with custom column names.
    pub fn new(name_column: impl Into<String>, instructor_column: impl Into<String>) -> Self {
        Self {
            name_column: name_column.into(),
            instructor_column: instructor_column.into(),
        }
    }

    /// Resolve a column name to the record slot that holds it.
    pub fn key_field(&self, column: &str) -> KeyField {
        if column == self.name_column {
            KeyField::Name
        } else if column == self.instructor_column {
            KeyField::Instructor
        } else {
            KeyField::Column(column.to_string())
        }
    }

    /// Column name for a key field.
    pub fn column_name<'a>(&'a self, field: &'a KeyField) -> &'a str {
        match field {
            KeyField::Name => &self.name_column,
            KeyField::Instructor => &self.instructor_column,
            KeyField::Column(c) => c,
        }
    }
}

/// A field an index can be keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyField {
    Name,
    Instructor,
    Column(String),
}

impl fmt::Display for KeyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyField::Name => write!(f, "name"),
            KeyField::Instructor => write!(f, "instructor"),
            KeyField::Column(c) => write!(f, "{}", c),
        }
    }
}

/// Result of looking a key field up on a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldLookup<'a> {
    Missing,
    Text(&'a str),
    NotText(&'a FieldValue),
}

/// One catalog entry.
///
/// Records are immutable once stored in the record store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    /// Course name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Instructor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,

    /// Pass-through columns, in source order
    #[serde(default)]
    pub extra: IndexMap<String, FieldValue>,
}

impl Record {
    /// Create a record with a name and an instructor.
    pub fn new(name: impl Into<String>, instructor: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            instructor: Some(instructor.into()),
            extra: IndexMap::new(),
        }
    }

    /// Add a pass-through column.
    pub fn with_field(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.extra.insert(column.into(), value.into());
        self
    }

    /// Split an ordered source row into a record.
    ///
    /// Name and instructor columns are lifted into the typed slots; a
    /// non-text value in one of them is kept in its display form.
    pub fn from_row(mut row: IndexMap<String, FieldValue>, schema: &FieldSchema) -> Self {
        let name = row
            .shift_remove(&schema.name_column)
            .map(|v| v.to_string());
        let instructor = row
            .shift_remove(&schema.instructor_column)
            .map(|v| v.to_string());
        Self {
            name,
            instructor,
            extra: row,
        }
    }

    /// Reassemble the ordered row: name, instructor, then pass-through columns.
    pub fn to_row(&self, schema: &FieldSchema) -> IndexMap<String, FieldValue> {
        let mut row = IndexMap::with_capacity(self.extra.len() + 2);
        if let Some(name) = &self.name {
            row.insert(schema.name_column.clone(), FieldValue::text(name.as_str()));
        }
        if let Some(instructor) = &self.instructor {
            row.insert(
                schema.instructor_column.clone(),
                FieldValue::text(instructor.as_str()),
            );
        }
        for (k, v) in &self.extra {
            row.insert(k.clone(), v.clone());
        }
        row
    }

    /// Course name, empty if the record has none.
    pub fn name_str(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Instructor, empty if the record has none.
    pub fn instructor_str(&self) -> &str {
        self.instructor.as_deref().unwrap_or("")
    }

    /// Look up the value an index would key this record by.
    pub fn lookup(&self, field: &KeyField) -> FieldLookup<'_> {
        match field {
            KeyField::Name => self
                .name
                .as_deref()
                .map_or(FieldLookup::Missing, FieldLookup::Text),
            KeyField::Instructor => self
                .instructor
                .as_deref()
                .map_or(FieldLookup::Missing, FieldLookup::Text),
            KeyField::Column(column) => match self.extra.get(column) {
                None => FieldLookup::Missing,
                Some(FieldValue::Text(s)) => FieldLookup::Text(s),
                Some(other) => FieldLookup::NotText(other),
            },
        }
    }
}
