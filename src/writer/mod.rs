// src/writer/mod.rs
//! Converting many DBD files into one array container
//!
//! [`StreamingWriter`] runs two passes over the input files: the first
//! reads only headers and sensor lists to build the [`UnionSchema`](crate::schema::UnionSchema),
//! the second decodes files in sorted order and appends their rows to an
//! [`ArraySink`] in batches of bounded size.

mod memory;
mod streaming;

pub use memory::MemorySink;
pub use streaming::{Discovery, StreamingWriter};

use crate::error::Result;
use crate::header::MissionFilter;
use crate::netcdf::{NcAttribute, NcWriter};
use crate::reader::ReaderOptions;
use crate::types::{Column, ColumnSpec};

/// Global attribute holding the number of records written
pub const ATTR_TOTAL_RECORDS: &str = "total_records";

/// Global attribute holding the number of files that contributed
pub const ATTR_N_FILES: &str = "n_files";

/// Destination of the streaming writer
///
/// Every variable shares one growing record dimension.
pub trait ArraySink {
    /// Declare the columns and the integer global attributes that will be
    /// set when writing ends
    fn define(&mut self, columns: &[ColumnSpec], attributes: &[&str]) -> Result<()>;

    /// Write `columns` (all of equal length) as records starting at `offset`
    fn append(&mut self, offset: usize, columns: &[Column]) -> Result<()>;

    fn set_global_attribute(&mut self, name: &str, value: i32) -> Result<()>;

    /// Called after the last append
    fn finish(&mut self) -> Result<()>;
}

impl ArraySink for NcWriter {
    fn define(&mut self, columns: &[ColumnSpec], attributes: &[&str]) -> Result<()> {
        for name in attributes {
            self.set_attribute(*name, NcAttribute::Ints(vec![0]))?;
        }
        self.define_variables(columns)
    }

    fn append(&mut self, offset: usize, columns: &[Column]) -> Result<()> {
        self.append_records(offset as u64, columns)?;
        self.flush()
    }

    fn set_global_attribute(&mut self, name: &str, value: i32) -> Result<()> {
        self.set_attribute(name, NcAttribute::Ints(vec![value]))
    }

    fn finish(&mut self) -> Result<()> {
        self.close()
    }
}

/// Options for multi-file conversion
#[derive(Debug, Clone, PartialEq)]
pub struct WriterOptions {
    /// Per-file decoding options. `skip_first_record` applies to every
    /// file except the first one that decodes.
    pub reader: ReaderOptions,
    pub missions: MissionFilter,
    /// Records buffered before they are appended to the sink
    pub batch_records: usize,
    /// Decoded files queued ahead of the sink
    pub pipeline_depth: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            reader: ReaderOptions::default().skip_first_record(true),
            missions: MissionFilter::All,
            batch_records: 100_000,
            pipeline_depth: 2,
        }
    }
}

impl WriterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reader(mut self, reader: ReaderOptions) -> Self {
        self.reader = reader;
        self
    }

    pub fn missions(mut self, missions: MissionFilter) -> Self {
        self.missions = missions;
        self
    }

    pub fn batch_records(mut self, records: usize) -> Self {
        self.batch_records = records.max(1);
        self
    }

    pub fn pipeline_depth(mut self, depth: usize) -> Self {
        self.pipeline_depth = depth.max(1);
        self
    }
}

/// What a conversion produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSummary {
    pub n_records: usize,
    /// Files that decoded and contributed to the output
    pub n_files: usize,
    /// Files skipped in either pass, with the reason
    pub failed: Vec<(std::path::PathBuf, String)>,
    /// Recoverable problems met in files that still contributed
    pub diagnostics: Vec<(std::path::PathBuf, String)>,
    pub columns: Vec<ColumnSpec>,
}

impl WriteSummary {
    /// True when no file produced output
    pub fn is_empty(&self) -> bool {
        self.n_files == 0
    }
}
