//! Arrow-backed rule tables.
//!
//! A rule table is a [`RecordBatch`] whose columns are all text. Spreadsheet
//! uploads land here with their header row as column names. Null cells read
//! back as empty strings, so callers never see the difference between a blank
//! cell and a missing value.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, LargeStringArray, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};

use crate::error::TableError;

/// Column matched against `rule_id` in modifications.
pub const RULE_ID: &str = "rule_id";
/// Column holding the rule text.
pub const RULE: &str = "rule";
/// Column holding the model's justification for a change.
pub const RATIONALE: &str = "rationale";

/// Separator between cell values when a row is flattened for prompting.
pub const CELL_SEPARATOR: &str = " | ";

/// An ordered set of rule rows keyed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    batch: RecordBatch,
}

impl RuleTable {
    /// Build a table from a header and row-major cell values.
    ///
    /// Every row must have exactly one cell per column.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, TableError> {
        let width = columns.len();
        if let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(TableError::RowWidth {
                row,
                expected: width,
                found: cells.len(),
            });
        }

        let fields: Vec<Field> = columns
            .iter()
            .map(|name| Field::new(name.as_str(), DataType::Utf8, true))
            .collect();

        let arrays: Vec<ArrayRef> = (0..width)
            .map(|col| {
                Arc::new(StringArray::from_iter_values(
                    rows.iter().map(|r| r[col].as_str()),
                )) as ArrayRef
            })
            .collect();

        // An explicit row count keeps zero-column tables valid.
        let options = RecordBatchOptions::new()
            .with_row_count(Some(rows.len()));
        let batch = RecordBatch::try_new_with_options(
            Arc::new(Schema::new(fields)),
            arrays,
            &options,
        )?;
        Ok(Self { batch })
    }

    /// Wrap an existing batch. Every column must be `Utf8` or `LargeUtf8`.
    pub fn from_batch(batch: RecordBatch) -> Result<Self, TableError> {
        for field in batch.schema().fields() {
            match field.data_type() {
                DataType::Utf8 | DataType::LargeUtf8 => {}
                other => {
                    return Err(TableError::NonTextColumn {
                        name: field.name().clone(),
                        data_type: other.to_string(),
                    });
                }
            }
        }
        Ok(Self { batch })
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// Column names in table order.
    pub fn columns(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.batch.schema().index_of(name).ok()
    }

    /// Cell text at `row` in the named column, or `None` if the column is missing.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        Some(self.cell_at(row, idx))
    }

    /// All cells of one row, in column order.
    pub fn row(&self, row: usize) -> Vec<&str> {
        (0..self.num_columns())
            .map(|col| self.cell_at(row, col))
            .collect()
    }

    /// Owned row-major copy of every cell.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        (0..self.num_rows())
            .map(|row| self.row(row).into_iter().map(str::to_string).collect())
            .collect()
    }

    /// Flatten to prompt text: cells joined by `" | "`, rows by newlines.
    /// The header row is not included.
    pub fn flatten(&self) -> String {
        (0..self.num_rows())
            .map(|row| self.row(row).join(CELL_SEPARATOR))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn cell_at(&self, row: usize, col: usize) -> &str {
        col_str(self.batch.column(col).as_ref(), row).unwrap_or("")
    }
}

/// Get a string value from a column that might be Utf8 or LargeUtf8.
fn col_str(col: &dyn Array, i: usize) -> Option<&str> {
    if col.is_null(i) {
        return None;
    }
    if let Some(arr) = col.as_any().downcast_ref::<StringArray>() {
        return Some(arr.value(i));
    }
    if let Some(arr) = col.as_any().downcast_ref::<LargeStringArray>() {
        return Some(arr.value(i));
    }
    None
}
