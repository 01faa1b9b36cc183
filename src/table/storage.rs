//! CSV persistence for tables.
//!
//! One `TableStore` owns one backing file for the lifetime of a session;
//! every write goes through it, so concurrent writers on the same path are
//! a configuration error rather than a runtime hazard. Saves are atomic:
//! the table is written to a temp file in the same directory and renamed
//! over the target.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use super::value::Value;
use super::Table;

/// Persistence failure, distinct from instruction-parse failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Owner of one table's backing CSV file.
#[derive(Debug, Clone)]
pub struct TableStore {
    path: PathBuf,
}

impl TableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load a private table instance from the backing file. Each session
    /// calls this once; sessions never share the returned table.
    pub fn load(&self) -> Result<Table, StorageError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(Value::from_field).collect());
        }

        debug!(path = %self.path.display(), rows = rows.len(), "table loaded");
        Ok(Table::from_rows(columns, rows))
    }

    /// Persist the table atomically: write a sibling temp file, then rename
    /// it over the backing file.
    pub fn save(&self, table: &Table) -> Result<(), StorageError> {
        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        let tmp = match dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new_in(".")?,
        };

        {
            let mut writer = csv::Writer::from_writer(tmp.as_file());
            writer.write_record(table.columns())?;
            for row in table.rows() {
                writer.write_record(row.iter().map(Value::to_string))?;
            }
            writer.flush()?;
        }

        tmp.persist(&self.path).map_err(|e| StorageError::Io(e.error))?;
        debug!(path = %self.path.display(), rows = table.len(), "table persisted");
        Ok(())
    }
}
