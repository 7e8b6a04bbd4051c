// src/decoder/batch.rs
use crate::error::{DbdError, Result};
use crate::types::{Column, ColumnSpec, ColumnValue};

/// Decoded rows held column by column
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBatch {
    specs: Vec<ColumnSpec>,
    columns: Vec<Column>,
    n_rows: usize,
}

impl DecodedBatch {
    pub fn new(specs: Vec<ColumnSpec>) -> Self {
        Self::with_capacity(specs, 0)
    }

    pub fn with_capacity(specs: Vec<ColumnSpec>, rows: usize) -> Self {
        let columns = specs
            .iter()
            .map(|spec| Column::with_capacity(spec.sensor_type, rows))
            .collect();
        DecodedBatch {
            specs,
            columns,
            n_rows: 0,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn n_columns(&self) -> usize {
        self.specs.len()
    }

    pub fn specs(&self) -> &[ColumnSpec] {
        &self.specs
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.specs
            .iter()
            .position(|s| s.name == name)
            .map(|i| &self.columns[i])
    }

    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Rows the columns can hold without reallocating
    pub fn capacity(&self) -> usize {
        self.columns.iter().map(Column::capacity).min().unwrap_or(usize::MAX)
    }

    pub fn reserve(&mut self, additional: usize) {
        for column in &mut self.columns {
            column.reserve(additional);
        }
    }

    /// Append one row; `row` holds one value per column
    pub fn push_row(&mut self, row: &[ColumnValue]) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(DbdError::TypeMismatch {
                expected: format!("{} columns", self.columns.len()),
                found: format!("{} values", row.len()),
            });
        }
        if let Some((column, value)) = self
            .columns
            .iter()
            .zip(row)
            .find(|(c, v)| c.sensor_type() != v.sensor_type())
        {
            return Err(DbdError::TypeMismatch {
                expected: column.sensor_type().name().to_string(),
                found: value.sensor_type().name().to_string(),
            });
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.push(*value)?;
        }
        self.n_rows += 1;
        Ok(())
    }

    /// Append the rows of `other` from `start` on. Both batches must have
    /// the same column types.
    pub fn append(&mut self, other: &DecodedBatch, start: usize) -> Result<()> {
        if other.columns.len() != self.columns.len() {
            return Err(DbdError::TypeMismatch {
                expected: format!("{} columns", self.columns.len()),
                found: format!("{} columns", other.columns.len()),
            });
        }
        for (column, source) in self.columns.iter_mut().zip(&other.columns) {
            column.extend_from(source, start)?;
        }
        self.n_rows += other.n_rows.saturating_sub(start);
        Ok(())
    }

    /// Append whole columns, one per batch column, all of equal length
    pub fn append_columns(&mut self, columns: &[Column]) -> Result<()> {
        if columns.len() != self.columns.len() {
            return Err(DbdError::TypeMismatch {
                expected: format!("{} columns", self.columns.len()),
                found: format!("{} columns", columns.len()),
            });
        }
        let n = columns.first().map_or(0, Column::len);
        if columns.iter().any(|c| c.len() != n) {
            return Err(DbdError::TypeMismatch {
                expected: format!("{} rows in every column", n),
                found: "columns of differing length".into(),
            });
        }
        if let Some((have, new)) = self
            .columns
            .iter()
            .zip(columns)
            .find(|(a, b)| a.sensor_type() != b.sensor_type())
        {
            return Err(DbdError::TypeMismatch {
                expected: have.sensor_type().name().to_string(),
                found: new.sensor_type().name().to_string(),
            });
        }
        for (column, source) in self.columns.iter_mut().zip(columns) {
            column.extend_from(source, 0)?;
        }
        self.n_rows += n;
        Ok(())
    }

    pub fn clear(&mut self) {
        for column in &mut self.columns {
            column.clear();
        }
        self.n_rows = 0;
    }

    pub fn into_parts(self) -> (Vec<ColumnSpec>, Vec<Column>) {
        (self.specs, self.columns)
    }
}
