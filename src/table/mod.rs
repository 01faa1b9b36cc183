//! Table adapter: a typed view over an in-memory tabular dataset.
//!
//! The table owns an ordered column list and positionally aligned rows.
//! Column types are not stored; they are inferred lazily per operation
//! (numeric when every non-null cell is digit-coercible, date when the
//! column name says so). The column set is fixed at load time - no
//! instruction can introduce a new column.

pub mod storage;
pub mod value;

pub use storage::{StorageError, TableStore};
pub use value::Value;

use serde::{Deserialize, Serialize};

/// In-memory tabular dataset for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given column set.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Assemble a table from prebuilt rows. Rows narrower than the column
    /// list are padded with nulls so the width invariant always holds.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, matched exactly first and case-insensitively
    /// as a fallback.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        if let Some(idx) = self.columns.iter().position(|c| c == name) {
            return Some(idx);
        }
        let lowered = name.to_lowercase();
        self.columns
            .iter()
            .position(|c| c.to_lowercase() == lowered)
    }

    pub fn column_exists(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Canonical spelling of a column named in an instruction.
    pub fn resolve_column(&self, name: &str) -> Option<&str> {
        self.column_index(name).map(|idx| self.columns[idx].as_str())
    }

    /// A column is numeric when it has at least one non-null cell and every
    /// non-null cell has a numeric view.
    pub fn is_numeric(&self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        let mut seen = false;
        for row in &self.rows {
            match &row[idx] {
                Value::Null => {}
                cell => {
                    if cell.as_number().is_none() {
                        return false;
                    }
                    seen = true;
                }
            }
        }
        seen
    }

    /// First column whose name contains "date", in column order.
    pub fn first_date_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.to_lowercase().contains("date"))
            .map(String::as_str)
    }

    /// Coerce a column's cells to dates in place; unparsable cells become
    /// null rather than failing the operation.
    pub fn coerce_date_column(&mut self, name: &str) {
        let Some(idx) = self.column_index(name) else {
            return;
        };
        for row in &mut self.rows {
            row[idx] = match row[idx].as_date() {
                Some(d) => Value::Date(d),
                None => Value::Null,
            };
        }
    }

    /// Build a row from (column, value) pairs, defaulting unnamed columns to
    /// null. Pair columns must already be canonical.
    pub fn row_from_pairs(&self, pairs: &[(String, Value)]) -> Vec<Value> {
        self.columns
            .iter()
            .map(|col| {
                pairs
                    .iter()
                    .find(|(name, _)| name == col)
                    .map(|(_, value)| value.clone())
                    .unwrap_or(Value::Null)
            })
            .collect()
    }

    /// Append a row. Width mismatches are padded/truncated to the column
    /// count; callers building rows via [`Table::row_from_pairs`] never hit
    /// that path.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Detached copy of the rows satisfying `keep`, with the same columns.
    pub fn select<F>(&self, keep: F) -> Table
    where
        F: Fn(&[Value]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keep(row))
                .cloned()
                .collect(),
        }
    }

    /// Number of rows satisfying `keep`.
    pub fn count_where<F>(&self, keep: F) -> usize
    where
        F: Fn(&[Value]) -> bool,
    {
        self.rows.iter().filter(|row| keep(row)).count()
    }

    /// Row-aligned evaluation of a row test, for use with the mask-based
    /// mutators below (the predicate needs `&self` for column lookups, so
    /// evaluation happens before mutation).
    pub fn match_mask<F>(&self, matches: F) -> Vec<bool>
    where
        F: Fn(&[Value]) -> bool,
    {
        self.rows.iter().map(|row| matches(row)).collect()
    }

    /// Drop every row flagged in `mask`; returns how many were removed.
    pub fn delete_rows(&mut self, mask: &[bool]) -> usize {
        let before = self.rows.len();
        let mut flags = mask.iter();
        self.rows
            .retain(|_| !matches!(flags.next(), Some(true)));
        before - self.rows.len()
    }

    /// Assign `value` to `column` on every row flagged in `mask`; returns
    /// how many rows changed.
    pub fn update_rows(&mut self, mask: &[bool], column: &str, value: Value) -> usize {
        let Some(idx) = self.column_index(column) else {
            return 0;
        };
        let mut changed = 0;
        for (row, flagged) in self.rows.iter_mut().zip(mask) {
            if *flagged {
                row[idx] = value.clone();
                changed += 1;
            }
        }
        changed
    }

    /// Plain-text preview (header plus up to `max_rows` rows) for chat
    /// replies and fallback prompts.
    pub fn preview(&self, max_rows: usize) -> String {
        let mut out = self.columns.join(",");
        for row in self.rows.iter().take(max_rows) {
            out.push('\n');
            let line: Vec<String> = row.iter().map(Value::to_string).collect();
            out.push_str(&line.join(","));
        }
        if self.rows.len() > max_rows {
            out.push_str(&format!("\n... ({} more rows)", self.rows.len() - max_rows));
        }
        out
    }
}
