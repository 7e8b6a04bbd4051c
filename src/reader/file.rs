// src/reader/file.rs
use crate::decoder::{DecodeContext, DecodePlan, DecodedBatch, RecordDecoder};
use crate::error::{DbdError, Result};
use crate::framing::FramingReader;
use crate::header::{FileHeader, MissionFilter};
use crate::known_bytes::KnownBytes;
use crate::reader::ReaderOptions;
use crate::sensors::{SensorCache, SensorCatalog};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Sensor caches shared by every file read with the same options
#[derive(Debug, Default)]
pub(crate) struct CacheRegistry {
    caches: RwLock<HashMap<PathBuf, Arc<SensorCache>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_file(&self, path: &Path, options: &ReaderOptions) -> Arc<SensorCache> {
        let dir = options.cache_dir_for(path);
        if let Some(cache) = self.caches.read().get(&dir) {
            return Arc::clone(cache);
        }
        let mut caches = self.caches.write();
        Arc::clone(
            caches
                .entry(dir.clone())
                .or_insert_with(|| Arc::new(SensorCache::new(dir))),
        )
    }
}

/// A file opened up to the start of its known-bytes block
pub(crate) struct DbdFile {
    pub path: PathBuf,
    pub header: FileHeader,
    pub catalog: SensorCatalog,
    pub diagnostics: Vec<DbdError>,
    reader: FramingReader,
}

impl DbdFile {
    /// Parse the header and sensor list and apply the keep/criteria filters
    pub fn open(path: &Path, cache: &SensorCache, options: &ReaderOptions) -> Result<Self> {
        let (reader, header) = Self::read_header(path, options)?;
        Self::with_header(path, reader, header, cache, options)
    }

    /// Like [`DbdFile::open`], but stops after the header when the file's
    /// mission is filtered out
    pub fn open_for_mission(
        path: &Path,
        cache: &SensorCache,
        options: &ReaderOptions,
        missions: &MissionFilter,
    ) -> Result<Option<Self>> {
        let (reader, header) = Self::read_header(path, options)?;
        if !missions.accepts(header.mission_name()) {
            log::debug!("{}: mission {} filtered out", path.display(), header.mission_name());
            return Ok(None);
        }
        Self::with_header(path, reader, header, cache, options).map(Some)
    }

    fn read_header(path: &Path, options: &ReaderOptions) -> Result<(FramingReader, FileHeader)> {
        let mut reader = open_stream(path, options.mmap)?;
        let header = FileHeader::parse(&mut reader)?;
        Ok((reader, header))
    }

    fn with_header(
        path: &Path,
        mut reader: FramingReader,
        header: FileHeader,
        cache: &SensorCache,
        options: &ReaderOptions,
    ) -> Result<Self> {
        let mut diagnostics = Vec::new();
        let mut catalog = SensorCatalog::read(&mut reader, &header, cache, &mut diagnostics)?;
        if catalog.is_empty() {
            return Err(DbdError::NoSensors(path.to_path_buf()));
        }
        catalog.filter(options.keep.as_deref(), options.criteria.as_deref());
        for d in &diagnostics {
            log::warn!("{}: {}", path.display(), d);
        }

        log::debug!(
            "{}: mission {}, {} sensors ({} output), {:?}",
            path.display(),
            header.mission_name(),
            catalog.len(),
            catalog.n_output(),
            catalog.source()
        );

        Ok(DbdFile {
            path: path.to_path_buf(),
            header,
            catalog,
            diagnostics,
            reader,
        })
    }

    /// Plan emitting this file's own output columns
    pub fn own_plan(&self) -> DecodePlan {
        DecodePlan::for_catalog(&self.catalog)
    }

    /// Read the known bytes and decode every record with `plan`
    pub fn decode(&mut self, plan: &DecodePlan, skip_first: bool, repair: bool) -> Result<DecodedBatch> {
        let known = KnownBytes::read(&mut self.reader)?;
        log::debug!("{}: flip_bytes={}", self.path.display(), known.flip_bytes);

        let mut ctx = DecodeContext::new(plan);
        let mut batch = DecodedBatch::new(plan.columns().to_vec());
        let mut decoder = RecordDecoder::new(&mut self.reader, plan, known.flip_bytes, repair);
        decoder.decode_into(&mut ctx, &mut batch, skip_first)?;

        let diagnostics = decoder.into_diagnostics();
        for d in &diagnostics {
            log::warn!("{}: {}", self.path.display(), d);
        }
        self.diagnostics.extend(diagnostics);
        Ok(batch)
    }
}

#[cfg(feature = "mmap")]
fn open_stream(path: &Path, mmap: bool) -> Result<FramingReader> {
    if mmap {
        FramingReader::open_mmap(path)
    } else {
        FramingReader::open(path)
    }
}

#[cfg(not(feature = "mmap"))]
fn open_stream(path: &Path, mmap: bool) -> Result<FramingReader> {
    if mmap {
        log::debug!("mmap requested without the \"mmap\" feature; reading {} normally", path.display());
    }
    FramingReader::open(path)
}
