// src/reader/mod.rs
//! Reading DBD files into memory
//!
//! - [`DbdReader`] decodes one file with its own sensor columns
//! - [`read_multiple`] merges several files onto their union schema
//! - [`scan_headers`] lists mission names and sensor-list CRCs without
//!   decoding any records

mod dbd_reader;
mod file;
mod multi;
mod scan;

pub use dbd_reader::DbdReader;
pub use multi::{read_multiple, MultiRead};
pub use scan::{missing_cache_entries, scan_headers, HeaderScan};

pub(crate) use file::{CacheRegistry, DbdFile};

use std::path::{Path, PathBuf};

/// Options controlling how a single file is decoded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReaderOptions {
    /// Sensor cache directory; `<file's directory>/cache` when unset
    pub cache_dir: Option<PathBuf>,
    /// Sensors to emit; all when unset
    pub keep: Option<Vec<String>>,
    /// Sensors whose new or repeated values admit a record; all when unset
    pub criteria: Option<Vec<String>>,
    /// Drop the first admitted record of the file
    pub skip_first_record: bool,
    /// Resynchronize after corrupt records instead of stopping
    pub repair: bool,
    /// Memory-map input files (requires the "mmap" feature)
    pub mmap: bool,
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn keep<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.keep = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn criteria<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.criteria = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn skip_first_record(mut self, skip: bool) -> Self {
        self.skip_first_record = skip;
        self
    }

    pub fn repair(mut self, repair: bool) -> Self {
        self.repair = repair;
        self
    }

    pub fn mmap(mut self, mmap: bool) -> Self {
        self.mmap = mmap;
        self
    }

    /// Cache directory used for `path`
    pub fn cache_dir_for(&self, path: &Path) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => path.parent().unwrap_or_else(|| Path::new(".")).join("cache"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_dir() {
        let options = ReaderOptions::new();
        assert_eq!(
            options.cache_dir_for(Path::new("/data/glider/01330000.dcd")),
            PathBuf::from("/data/glider/cache")
        );
        let options = options.cache_dir("/tmp/cac");
        assert_eq!(options.cache_dir_for(Path::new("x.dbd")), PathBuf::from("/tmp/cac"));
    }

    #[test]
    fn test_builder() {
        let options = ReaderOptions::new()
            .keep(["m_depth"])
            .criteria(vec!["m_present_time".to_string()])
            .skip_first_record(true)
            .repair(true);
        assert_eq!(options.keep, Some(vec!["m_depth".to_string()]));
        assert_eq!(options.criteria.as_deref(), Some(&["m_present_time".to_string()][..]));
        assert!(options.skip_first_record && options.repair && !options.mmap);
    }
}
