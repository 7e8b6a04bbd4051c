// src/writer/memory.rs
use crate::decoder::DecodedBatch;
use crate::error::{DbdError, Result};
use crate::types::{Column, ColumnSpec};
use crate::writer::ArraySink;
use std::collections::BTreeMap;

/// Sink that keeps every record in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    batch: Option<DecodedBatch>,
    attributes: BTreeMap<String, i32>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn attribute(&self, name: &str) -> Option<i32> {
        self.attributes.get(name).copied()
    }

    pub fn attributes(&self) -> &BTreeMap<String, i32> {
        &self.attributes
    }

    pub fn n_rows(&self) -> usize {
        self.batch.as_ref().map_or(0, DecodedBatch::n_rows)
    }

    /// The collected records; empty with no columns if nothing was defined
    pub fn into_batch(self) -> DecodedBatch {
        self.batch.unwrap_or_else(|| DecodedBatch::new(Vec::new()))
    }
}

impl ArraySink for MemorySink {
    fn define(&mut self, columns: &[ColumnSpec], attributes: &[&str]) -> Result<()> {
        if self.batch.is_some() {
            return Err(DbdError::InvalidContainer("columns already defined".into()));
        }
        self.batch = Some(DecodedBatch::new(columns.to_vec()));
        for name in attributes {
            self.attributes.insert(name.to_string(), 0);
        }
        Ok(())
    }

    fn append(&mut self, offset: usize, columns: &[Column]) -> Result<()> {
        if self.finished {
            return Err(DbdError::WriterClosed);
        }
        let batch = self
            .batch
            .as_mut()
            .ok_or_else(|| DbdError::InvalidContainer("columns are not defined".into()))?;
        if offset != batch.n_rows() {
            return Err(DbdError::InvalidContainer(format!(
                "append at {} but {} records are stored",
                offset,
                batch.n_rows()
            )));
        }

        batch.append_columns(columns)
    }

    fn set_global_attribute(&mut self, name: &str, value: i32) -> Result<()> {
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
