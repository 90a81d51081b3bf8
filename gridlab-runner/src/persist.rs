//! CSV persistence for the aligned table.
//!
//! - Atomic writes (write to a `.tmp` sibling, rename into place)
//! - Missing driver values are written as empty fields
//! - Reads keep the timestamp column as text

use gridlab_core::data::AlignedTable;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error at {path}: {source}")]
    Csv { path: PathBuf, source: PolarsError },
}

/// Write the table to `path` as comma-delimited text with a header row.
///
/// The parent directory is created when absent. A failed write leaves any
/// previous file at `path` untouched.
pub fn write_table(table: &AlignedTable, path: &Path) -> Result<(), PersistError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| PersistError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let mut df = table.to_dataframe().map_err(|source| PersistError::Csv {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp_path = tmp_sibling(path);
    if let Err(e) = write_csv(&mut df, &tmp_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        PersistError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Read a persisted table back into a DataFrame.
pub fn read_table(path: &Path) -> Result<DataFrame, PersistError> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|source| PersistError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<(), PersistError> {
    let mut file = File::create(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)
        .map_err(|source| PersistError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    file.sync_all().map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gridlab_core::data::{FrameColumn, TimeFrame};

    fn table() -> AlignedTable {
        AlignedTable::from_frame(TimeFrame {
            index: vec![
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap(),
            ],
            columns: vec![
                FrameColumn {
                    name: "price_da".into(),
                    values: vec![Some(50.5), Some(-3.25)],
                },
                FrameColumn {
                    name: "solar".into(),
                    values: vec![None, Some(12.0)],
                },
            ],
        })
    }

    #[test]
    fn writes_header_and_empty_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("training_data.csv");

        write_table(&table(), &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "timestamp,price_da,solar,hour,day_of_week,month");
        assert!(lines[1].starts_with("2024-01-01 00:00:00+00:00,50.5,,0,0,1"));
        assert_eq!(lines.len(), 3);
        assert!(!tmp_sibling(&path).exists());
    }

    #[test]
    fn read_keeps_timestamp_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        write_table(&table(), &path).unwrap();

        let df = read_table(&path).unwrap();
        assert_eq!(df.shape(), (2, 6));
        assert_eq!(df.column("timestamp").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("solar").unwrap().null_count(), 1);
    }

    #[test]
    fn read_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_table(&dir.path().join("absent.csv")).is_err());
    }

    #[test]
    fn tmp_sibling_appends_suffix() {
        assert_eq!(
            tmp_sibling(Path::new("data/training_data.csv")),
            PathBuf::from("data/training_data.csv.tmp")
        );
    }
}
