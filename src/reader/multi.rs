// src/reader/multi.rs
use crate::decoder::DecodedBatch;
use crate::error::Result;
use crate::writer::{MemorySink, StreamingWriter, WriteSummary, WriterOptions};
use std::path::Path;

/// Records of several files merged onto their union schema
#[derive(Debug, Clone)]
pub struct MultiRead {
    pub data: DecodedBatch,
    pub summary: WriteSummary,
}

impl MultiRead {
    pub fn n_records(&self) -> usize {
        self.data.n_rows()
    }
}

/// Decode `paths` in sorted order into one in-memory batch.
///
/// Files behave exactly as with [`StreamingWriter::write_netcdf`]: sensors
/// missing from a file read as fill values, and `skip_first_record` drops
/// the first record of every file after the first.
///
/// # Example
///
/// ```no_run
/// use dbd_rs::reader::read_multiple;
/// use dbd_rs::writer::WriterOptions;
///
/// let merged = read_multiple(&["01330000.dcd", "01330001.dcd"], &WriterOptions::default()).unwrap();
/// println!("{} records, {} files", merged.n_records(), merged.summary.n_files);
/// ```
pub fn read_multiple<P: AsRef<Path> + Sync>(paths: &[P], options: &WriterOptions) -> Result<MultiRead> {
    let writer = StreamingWriter::new(options.clone());
    let mut sink = MemorySink::new();
    let summary = writer.write(paths, &mut sink)?;
    Ok(MultiRead {
        data: sink.into_batch(),
        summary,
    })
}
