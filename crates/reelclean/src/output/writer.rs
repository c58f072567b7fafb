//! Atomic CSV output.
//!
//! Tables are written to a temporary sibling file and renamed into place,
//! so a failed run never leaves a truncated output behind.

use std::fs;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, WriterBuilder};
use tracing::{debug, info};

use crate::error::{CleanError, Result};
use crate::input::DataTable;

/// CSV writer settings.
#[derive(Debug, Clone)]
pub struct CsvWriter {
    delimiter: u8,
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvWriter {
    /// Comma-delimited writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Write `table` (header plus rows) to `path`, replacing any existing file.
    pub fn write(&self, table: &DataTable, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| CleanError::io(parent, e))?;
            }
        }

        let tmp = temp_path(path);
        debug!("Writing {} rows to {}", table.row_count(), tmp.display());

        if let Err(e) = self.write_to(table, &tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            CleanError::io(path, e)
        })?;

        info!("Saved {} records to {}", table.row_count(), path.display());
        Ok(())
    }

    fn write_to(&self, table: &DataTable, path: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote_style(QuoteStyle::Necessary)
            .from_path(path)?;

        writer.write_record(&table.headers)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(|e| CleanError::io(path, e))?;
        Ok(())
    }
}

/// Write a comma-delimited CSV file atomically.
pub fn write_csv(table: &DataTable, path: impl AsRef<Path>) -> Result<()> {
    CsvWriter::new().write(table, path)
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Parser;
    use tempfile::TempDir;

    fn table() -> DataTable {
        DataTable::new(
            vec!["user_id".into(), "name".into()],
            vec![
                vec!["1".into(), "Ana, Jr.".into()],
                vec!["2".into(), "".into()],
            ],
            b',',
        )
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cleaned_users.csv");

        write_csv(&table(), &path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "user_id,name\n1,\"Ana, Jr.\"\n2,\n");

        let (back, _) = Parser::new().parse_file(&path).unwrap();
        assert_eq!(back.rows, table().rows);
    }

    #[test]
    fn test_overwrites_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "stale").unwrap();

        write_csv(&table(), &path).unwrap();

        assert!(fs::read_to_string(&path).unwrap().starts_with("user_id"));
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_header_only_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");
        let empty = table().with_rows(Vec::new());

        write_csv(&empty, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "user_id,name\n");
    }

    #[test]
    fn test_tab_delimiter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.tsv");

        CsvWriter::new().with_delimiter(b'\t').write(&table(), &path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().starts_with("user_id\tname\n"));
    }
}
