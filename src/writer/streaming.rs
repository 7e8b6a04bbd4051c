// src/writer/streaming.rs
use crate::decoder::DecodedBatch;
use crate::error::{DbdError, Result};
use crate::netcdf::NcWriter;
use crate::reader::{CacheRegistry, DbdFile};
use crate::schema::UnionSchema;
use crate::sensors::SensorCatalog;
use crate::writer::{ArraySink, WriteSummary, WriterOptions, ATTR_N_FILES, ATTR_TOTAL_RECORDS};
use crossbeam_channel::{bounded, Receiver, Sender};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::thread;

/// Result of the first pass
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub schema: UnionSchema,
    /// Files that passed the mission filter and have a readable sensor list,
    /// in sorted order
    pub files: Vec<PathBuf>,
    /// Files that could not be scanned
    pub failed: Vec<(PathBuf, String)>,
}

/// One decoded file on its way to the sink
struct FileOutput {
    batch: DecodedBatch,
    diagnostics: Vec<DbdError>,
}

/// Two-pass converter from DBD files to an [`ArraySink`]
///
/// # Example
///
/// ```no_run
/// use dbd_rs::writer::{StreamingWriter, WriterOptions};
///
/// let files = vec!["01330000.dcd", "01330001.dcd"];
/// let writer = StreamingWriter::new(WriterOptions::default());
/// let summary = writer.write_netcdf(&files, "deployment.nc").unwrap();
/// println!("{} records from {} files", summary.n_records, summary.n_files);
/// ```
pub struct StreamingWriter {
    options: WriterOptions,
    caches: CacheRegistry,
}

impl StreamingWriter {
    pub fn new(options: WriterOptions) -> Self {
        StreamingWriter {
            options,
            caches: CacheRegistry::new(),
        }
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Pass 1: read headers and sensor lists and build the union schema.
    ///
    /// Files are scanned in parallel; the union is built in sorted
    /// filename order.
    pub fn discover<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> Discovery {
        let mut sorted: Vec<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        sorted.sort();
        sorted.dedup();

        let scanned: Vec<(PathBuf, Result<Option<SensorCatalog>>)> = sorted
            .into_par_iter()
            .map(|path| {
                let result = self.scan_file(&path);
                (path, result)
            })
            .collect();

        let mut discovery = Discovery::default();
        for (path, result) in scanned {
            match result {
                Ok(Some(catalog)) => {
                    discovery.schema.add_catalog(&catalog);
                    discovery.files.push(path);
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    discovery.failed.push((path, e.to_string()));
                }
            }
        }

        log::info!(
            "Found {} files with {} distinct output sensors ({} skipped)",
            discovery.files.len(),
            discovery.schema.len(),
            discovery.failed.len()
        );
        discovery
    }

    fn scan_file(&self, path: &Path) -> Result<Option<SensorCatalog>> {
        let cache = self.caches.for_file(path, &self.options.reader);
        let file = DbdFile::open_for_mission(path, &cache, &self.options.reader, &self.options.missions)?;
        Ok(file.map(|f| f.catalog))
    }

    /// Convert `paths` into `sink`
    pub fn write<P: AsRef<Path> + Sync, S: ArraySink>(&self, paths: &[P], sink: &mut S) -> Result<WriteSummary> {
        let discovery = self.discover(paths);
        self.write_discovered(&discovery, sink)
    }

    /// Convert `paths` into a netCDF file at `output`.
    ///
    /// The output is not created when no file contributes a column.
    pub fn write_netcdf<P: AsRef<Path> + Sync>(&self, paths: &[P], output: impl AsRef<Path>) -> Result<WriteSummary> {
        let discovery = self.discover(paths);
        if discovery.schema.is_empty() {
            log::warn!("No sensors to write; {} not created", output.as_ref().display());
            return Ok(WriteSummary {
                failed: discovery.failed,
                ..WriteSummary::default()
            });
        }
        let mut writer = NcWriter::create(output.as_ref())?;
        self.write_discovered(&discovery, &mut writer)
    }

    /// Pass 2: decode the discovered files in order and stream their rows
    /// into `sink`
    pub fn write_discovered<S: ArraySink>(&self, discovery: &Discovery, sink: &mut S) -> Result<WriteSummary> {
        let mut summary = WriteSummary {
            failed: discovery.failed.clone(),
            columns: discovery.schema.columns().to_vec(),
            ..WriteSummary::default()
        };
        if discovery.schema.is_empty() {
            return Ok(summary);
        }

        sink.define(discovery.schema.columns(), &[ATTR_TOTAL_RECORDS, ATTR_N_FILES])?;

        let (tx, rx) = bounded(self.options.pipeline_depth.max(1));
        thread::scope(|scope| {
            scope.spawn(|| self.produce(&discovery.files, &discovery.schema, tx));
            self.consume(rx, &discovery.schema, sink, &mut summary)
        })?;

        sink.set_global_attribute(ATTR_TOTAL_RECORDS, to_attribute(ATTR_TOTAL_RECORDS, summary.n_records))?;
        sink.set_global_attribute(ATTR_N_FILES, to_attribute(ATTR_N_FILES, summary.n_files))?;
        sink.finish()?;

        log::info!("Wrote {} records from {} files", summary.n_records, summary.n_files);
        Ok(summary)
    }

    /// Decode files in order, handing each to the consumer.
    ///
    /// Every file after the first one that decodes drops its first record
    /// when `skip_first_record` is set.
    fn produce(&self, files: &[PathBuf], schema: &UnionSchema, tx: Sender<(PathBuf, Result<FileOutput>)>) {
        let mut decoded_any = false;
        for path in files {
            let skip_first = self.options.reader.skip_first_record && decoded_any;
            let result = self.decode_file(path, schema, skip_first);
            decoded_any |= result.is_ok();
            if tx.send((path.clone(), result)).is_err() {
                log::debug!("Writer stopped; abandoning remaining files");
                break;
            }
        }
    }

    fn decode_file(&self, path: &Path, schema: &UnionSchema, skip_first: bool) -> Result<FileOutput> {
        let cache = self.caches.for_file(path, &self.options.reader);
        let mut file = DbdFile::open(path, &cache, &self.options.reader)?;

        let mut conflicts = Vec::new();
        let plan = schema.plan_for(&file.catalog, &mut conflicts);
        for conflict in &conflicts {
            log::warn!("{}: {}", path.display(), conflict);
        }
        file.diagnostics.extend(conflicts);

        let batch = file.decode(&plan, skip_first, self.options.reader.repair)?;
        log::debug!("{}: {} records", path.display(), batch.n_rows());
        Ok(FileOutput {
            batch,
            diagnostics: file.diagnostics,
        })
    }

    /// Gather decoded files into a buffer of `batch_records` rows, flushing
    /// it to the sink whenever the next file would overflow it
    fn consume<S: ArraySink>(
        &self,
        rx: Receiver<(PathBuf, Result<FileOutput>)>,
        schema: &UnionSchema,
        sink: &mut S,
        summary: &mut WriteSummary,
    ) -> Result<()> {
        let budget = self.options.batch_records.max(1);
        let mut buffer = DecodedBatch::with_capacity(schema.columns().to_vec(), budget);

        for (path, result) in rx {
            let output = match result {
                Ok(output) => output,
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    summary.failed.push((path, e.to_string()));
                    continue;
                }
            };

            let rows = output.batch.n_rows();
            if !buffer.is_empty() && buffer.n_rows() + rows > budget {
                self.flush(&mut buffer, sink, summary)?;
            }
            if rows > budget {
                log::debug!("{}: {} records exceed the batch size; growing buffers", path.display(), rows);
                buffer.reserve(rows);
            }
            buffer.append(&output.batch, 0)?;

            summary.n_files += 1;
            summary
                .diagnostics
                .extend(output.diagnostics.iter().map(|d| (path.clone(), d.to_string())));
        }

        if !buffer.is_empty() {
            self.flush(&mut buffer, sink, summary)?;
        }
        Ok(())
    }

    fn flush<S: ArraySink>(&self, buffer: &mut DecodedBatch, sink: &mut S, summary: &mut WriteSummary) -> Result<()> {
        sink.append(summary.n_records, buffer.columns())?;
        summary.n_records += buffer.n_rows();
        log::info!("Flushed {} records ({} total)", buffer.n_rows(), summary.n_records);
        buffer.clear();
        Ok(())
    }
}

/// Counts are stored as NC_INT; larger values are capped with a warning
fn to_attribute(name: &str, n: usize) -> i32 {
    i32::try_from(n).unwrap_or_else(|_| {
        log::warn!("{} = {} does not fit a 32-bit attribute; storing {}", name, n, i32::MAX);
        i32::MAX
    })
}
