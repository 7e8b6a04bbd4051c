// src/reader/dbd_reader.rs
use crate::decoder::DecodedBatch;
use crate::error::{DbdError, Result};
use crate::header::FileHeader;
use crate::reader::{DbdFile, ReaderOptions};
use crate::sensors::{SensorCache, SensorCatalog};
use crate::types::Column;
use std::path::{Path, PathBuf};

/// A fully decoded DBD file
///
/// # Example
///
/// ```no_run
/// use dbd_rs::reader::{DbdReader, ReaderOptions};
///
/// let options = ReaderOptions::new().keep(["m_present_time", "m_depth"]);
/// let reader = DbdReader::open("01330000.dcd", &options).unwrap();
/// println!("{} records from mission {}", reader.n_records(), reader.header().mission_name());
/// ```
#[derive(Debug)]
pub struct DbdReader {
    path: PathBuf,
    header: FileHeader,
    catalog: SensorCatalog,
    batch: DecodedBatch,
    diagnostics: Vec<DbdError>,
}

impl DbdReader {
    pub fn open(path: impl AsRef<Path>, options: &ReaderOptions) -> Result<Self> {
        let path = path.as_ref();
        let cache = SensorCache::new(options.cache_dir_for(path));
        Self::open_with_cache(path, &cache, options)
    }

    /// Open a file using an existing cache handle
    pub fn open_with_cache(path: impl AsRef<Path>, cache: &SensorCache, options: &ReaderOptions) -> Result<Self> {
        let mut file = DbdFile::open(path.as_ref(), cache, options)?;
        let plan = file.own_plan();
        let batch = file.decode(&plan, options.skip_first_record, options.repair)?;

        Ok(DbdReader {
            path: file.path,
            header: file.header,
            catalog: file.catalog,
            batch,
            diagnostics: file.diagnostics,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn catalog(&self) -> &SensorCatalog {
        &self.catalog
    }

    /// Names of every sensor in the file, in file order
    pub fn sensor_names(&self) -> Vec<String> {
        self.catalog.names()
    }

    /// Names of the output columns
    pub fn column_names(&self) -> Vec<String> {
        self.batch.column_names()
    }

    pub fn n_records(&self) -> usize {
        self.batch.n_rows()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.batch.column(name)
    }

    pub fn data(&self) -> &DecodedBatch {
        &self.batch
    }

    /// Recoverable problems met while reading
    pub fn diagnostics(&self) -> &[DbdError] {
        &self.diagnostics
    }

    pub fn into_batch(self) -> DecodedBatch {
        self.batch
    }
}
