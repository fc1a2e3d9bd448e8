//! CSV source and sink.
//!
//! The first row of a source file is the header. Rows may be shorter or
//! longer than the header: extra cells are ignored, missing and empty cells
//! become [`UNKNOWN_VALUE`]. Bytes that are not valid UTF-8 are replaced with
//! U+FFFD rather than failing the load.

use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::Path;

use catalog_types::{FieldSchema, FieldValue, Record, UNKNOWN_VALUE};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::LoadError;

const BOM: char = '\u{feff}';

/// Parse a CSV file into ordered records.
pub fn read_records(path: &Path, schema: &FieldSchema) -> Result<Vec<Record>, LoadError> {
    let file = File::open(path).map_err(|e| LoadError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut rows = reader.byte_records();
    let mut lossy_rows = 0usize;
    let headers: Vec<String> = match rows.next() {
        Some(header) => {
            let header = header.map_err(|e| LoadError::parse(path, e))?;
            let (cells, lossy) = decode_row(&header);
            if lossy {
                lossy_rows += 1;
            }
            cells
                .into_iter()
                .enumerate()
                .map(|(i, h)| {
                    if i == 0 {
                        h.trim_start_matches(BOM).to_string()
                    } else {
                        h
                    }
                })
                .collect()
        }
        None => {
            warn!(path = %path.display(), "Source file is empty");
            return Ok(Vec::new());
        }
    };

    if !headers.iter().any(|h| h == &schema.name_column) {
        warn!(
            path = %path.display(),
            column = %schema.name_column,
            "Name column missing from header; no record will match a name filter"
        );
    }

    let mut records = Vec::new();
    let mut ragged = 0usize;
    for row in rows {
        let row = row.map_err(|e| LoadError::parse(path, e))?;
        if row.len() != headers.len() {
            ragged += 1;
        }
        let (cells, lossy) = decode_row(&row);
        if lossy {
            lossy_rows += 1;
        }

        let mut fields = IndexMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let value = match cells.get(i) {
                Some(cell) if !cell.is_empty() => FieldValue::text(cell.as_str()),
                _ => FieldValue::unknown(),
            };
            fields.insert(header.clone(), value);
        }
        records.push(Record::from_row(fields, schema));
    }

    if lossy_rows > 0 {
        warn!(
            path = %path.display(),
            rows = lossy_rows,
            "Replaced invalid UTF-8 in source rows"
        );
    }

    debug!(
        path = %path.display(),
        records = records.len(),
        ragged,
        "Parsed source file"
    );
    Ok(records)
}

/// Decode every cell, replacing invalid UTF-8. The flag is set if any cell
/// needed replacement.
fn decode_row(row: &csv::ByteRecord) -> (Vec<String>, bool) {
    let mut lossy = false;
    let cells = row
        .iter()
        .map(|cell| match String::from_utf8_lossy(cell) {
            Cow::Borrowed(text) => text.to_string(),
            Cow::Owned(text) => {
                lossy = true;
                text
            }
        })
        .collect();
    (cells, lossy)
}

/// Count data rows (header excluded).
pub fn count_rows(path: &Path) -> Result<usize, LoadError> {
    let file = File::open(path).map_err(|e| LoadError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut count = 0;
    for row in reader.byte_records() {
        row.map_err(|e| LoadError::parse(path, e))?;
        count += 1;
    }
    Ok(count)
}

/// Create (or truncate) a CSV file holding the header and all rows.
pub fn write_rows(
    path: &Path,
    headers: &[&str],
    rows: &[IndexMap<String, FieldValue>],
) -> Result<(), LoadError> {
    let file = File::create(path).map_err(|e| LoadError::io(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    writer
        .write_record(headers)
        .map_err(|e| LoadError::parse(path, e))?;
    for row in rows {
        writer
            .write_record(ordered_cells(headers, row))
            .map_err(|e| LoadError::parse(path, e))?;
    }
    writer.flush().map_err(|e| LoadError::io(path, e))
}

/// Append one row, creating the file with a header if it does not exist.
pub fn append_row(
    path: &Path,
    headers: &[&str],
    row: &IndexMap<String, FieldValue>,
) -> Result<(), LoadError> {
    if !path.exists() {
        return write_rows(path, headers, std::slice::from_ref(row));
    }

    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| LoadError::io(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    writer
        .write_record(ordered_cells(headers, row))
        .map_err(|e| LoadError::parse(path, e))?;
    writer.flush().map_err(|e| LoadError::io(path, e))
}

fn ordered_cells(headers: &[&str], row: &IndexMap<String, FieldValue>) -> Vec<String> {
    headers
        .iter()
        .map(|h| {
            row.get(*h)
                .map(|v| v.to_string())
                .unwrap_or_else(|| UNKNOWN_VALUE.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_records_in_order() {
        let temp = TempDir::new().unwrap();
        let path = write_file(
            &temp,
            "courses.csv",
            "course_name,instructor,credit\nAlgorithms,Lee,3\nData Structures,Chen,4\n",
        );

        let records = read_records(&path, &FieldSchema::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name_str(), "Algorithms");
        assert_eq!(records[1].instructor_str(), "Chen");
        assert_eq!(records[1].extra.get("credit"), Some(&FieldValue::text("4")));
    }

    #[test]
    fn test_ragged_rows_are_tolerated() {
        let temp = TempDir::new().unwrap();
        let path = write_file(
            &temp,
            "ragged.csv",
            "course_name,instructor,credit\nShort,Lee\nLong,Chen,4,extra,cells\n",
        );

        let records = read_records(&path, &FieldSchema::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].extra.get("credit"), Some(&FieldValue::unknown()));
        assert_eq!(records[1].extra.len(), 1);
    }

    #[test]
    fn test_empty_cells_become_unknown() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "empty.csv", "course_name,instructor\nAlgorithms,\n");

        let records = read_records(&path, &FieldSchema::default()).unwrap();
        assert_eq!(records[0].instructor.as_deref(), Some(UNKNOWN_VALUE));
    }

    #[test]
    fn test_bom_is_stripped_from_header() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "bom.csv", "\u{feff}course_name,instructor\nAlgorithms,Lee\n");

        let records = read_records(&path, &FieldSchema::default()).unwrap();
        assert_eq!(records[0].name.as_deref(), Some("Algorithms"));
    }

    #[test]
    fn test_empty_file_yields_no_records() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "none.csv", "");
        assert!(read_records(&path, &FieldSchema::default()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = read_records(&temp.path().join("absent.csv"), &FieldSchema::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_fatal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("latin1.csv");
        std::fs::write(&path, b"course_name,instructor\nAlgorithms,Lee\nNetworks,W\xffu\n").unwrap();

        let records = read_records(&path, &FieldSchema::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].instructor_str(), "Lee");
        assert_eq!(records[1].name_str(), "Networks");
        assert_eq!(records[1].instructor_str(), "W\u{fffd}u");
        assert_eq!(count_rows(&path).unwrap(), 2);
    }

    #[test]
    fn test_append_creates_then_appends() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("new.csv");
        let headers = ["course_name", "instructor", "grade"];

        let mut first = IndexMap::new();
        first.insert("course_name".to_string(), FieldValue::text("Compilers"));
        first.insert("instructor".to_string(), FieldValue::text("Chen"));
        append_row(&path, &headers, &first).unwrap();

        let mut second = IndexMap::new();
        second.insert("grade".to_string(), FieldValue::Number(90.0));
        second.insert("course_name".to_string(), FieldValue::text("Networks"));
        append_row(&path, &headers, &second).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "course_name,instructor,grade\nCompilers,Chen,unknown\nNetworks,unknown,90\n"
        );
        assert_eq!(count_rows(&path).unwrap(), 2);
    }

    #[test]
    fn test_write_rows_truncates() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "out.csv", "stale,content\n1,2\n3,4\n");

        write_rows(&path, &["course_name"], &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "course_name\n");
        assert_eq!(count_rows(&path).unwrap(), 0);
    }
}
