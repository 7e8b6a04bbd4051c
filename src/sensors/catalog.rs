// src/sensors/catalog.rs
use crate::error::{DbdError, Result};
use crate::framing::FramingReader;
use crate::header::FileHeader;
use crate::sensors::{SensorCache, SensorDescriptor};
use crate::utils::decode_ascii_line;
use std::collections::HashMap;
use std::path::PathBuf;

/// Longest sensor-list line accepted before it is treated as binary data
const MAX_SENSOR_LINE: usize = 1024;

/// Where a catalog's sensor list came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// `s:` lines embedded in the file itself
    FromFile,
    /// A sensor cache file, for factored files
    FromCache(PathBuf),
}

/// The ordered sensor list of one file, with name and file-index lookups
#[derive(Debug, Clone)]
pub struct SensorCatalog {
    sensors: Vec<SensorDescriptor>,
    by_name: HashMap<String, usize>,
    by_file_index: HashMap<usize, usize>,
    source: CatalogSource,
    n_output: usize,
}

impl SensorCatalog {
    pub fn new(sensors: Vec<SensorDescriptor>, source: CatalogSource) -> Self {
        let by_name = sensors
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
        let by_file_index = sensors
            .iter()
            .enumerate()
            .map(|(i, s)| (s.file_index, i))
            .collect();
        let n_output = sensors.len();

        let mut catalog = SensorCatalog {
            sensors,
            by_name,
            by_file_index,
            source,
            n_output,
        };
        catalog.assign_output_indices();
        catalog
    }

    /// Read the sensor list of a file whose header has just been parsed.
    ///
    /// Leaves the reader positioned at the known-bytes block. Recoverable
    /// problems (a truncated inline list, a missing cache entry with an
    /// inline fallback) are pushed onto `diagnostics`.
    pub fn read(
        reader: &mut FramingReader,
        header: &FileHeader,
        cache: &SensorCache,
        diagnostics: &mut Vec<DbdError>,
    ) -> Result<Self> {
        let expected = header.num_sensors();

        if !header.is_factored() {
            let sensors = Self::read_inline(reader, expected, diagnostics)?;
            return Ok(SensorCatalog::new(sensors, CatalogSource::FromFile));
        }

        let crc = header.sensor_list_crc();
        match cache.load(crc) {
            Ok(entry) => {
                // Some producers embed the list even when it is factored
                Self::skip_inline(reader)?;
                Self::seek_known_bytes(reader)?;
                Ok(SensorCatalog::new(
                    entry.sensors.clone(),
                    CatalogSource::FromCache(entry.path.clone()),
                ))
            }
            Err(not_found) => {
                let mut inline_diagnostics = Vec::new();
                let sensors = Self::read_inline(reader, expected, &mut inline_diagnostics)?;
                if sensors.is_empty() {
                    return Err(not_found);
                }
                diagnostics.append(&mut inline_diagnostics);
                log::debug!(
                    "Sensor cache entry {} missing from {:?}; using {} sensors embedded in the file",
                    crc,
                    cache.dir(),
                    sensors.len()
                );
                diagnostics.push(not_found);
                Ok(SensorCatalog::new(sensors, CatalogSource::FromFile))
            }
        }
    }

    /// Read up to `expected` `s:` lines. A malformed or missing line ends
    /// the list early and records `IncompleteSensorList`.
    fn read_inline(
        reader: &mut FramingReader,
        expected: usize,
        diagnostics: &mut Vec<DbdError>,
    ) -> Result<Vec<SensorDescriptor>> {
        let mut sensors = Vec::with_capacity(expected);

        while sensors.len() < expected {
            if reader.peek(2)? != b"s:" {
                break;
            }
            let raw = reader.peek_line(MAX_SENSOR_LINE)?;
            let consumed = raw.len();
            let parsed = decode_ascii_line(raw)
                .ok_or_else(|| DbdError::InvalidSensorLine(String::from_utf8_lossy(raw).into_owned()))
                .and_then(|line| SensorDescriptor::parse_line(&line));

            match parsed {
                Ok(sensor) => {
                    reader.skip(consumed)?;
                    sensors.push(sensor);
                }
                Err(e) => {
                    log::debug!("Sensor list ends at malformed line: {}", e);
                    break;
                }
            }
        }

        if sensors.len() < expected {
            log::debug!("Sensor list truncated: expected {}, found {}", expected, sensors.len());
            diagnostics.push(DbdError::IncompleteSensorList {
                expected,
                found: sensors.len(),
            });
        }
        Ok(sensors)
    }

    fn skip_inline(reader: &mut FramingReader) -> Result<()> {
        while reader.peek(2)? == b"s:" {
            let line = reader.read_line()?;
            if line.is_empty() {
                break;
            }
        }
        Ok(())
    }

    /// Advance to the `sa` that opens the known-bytes block
    fn seek_known_bytes(reader: &mut FramingReader) -> Result<()> {
        loop {
            let ahead = reader.peek(2)?;
            if ahead.len() < 2 || ahead == b"sa" {
                return Ok(());
            }
            reader.skip(1)?;
        }
    }

    /// Mark which sensors are output columns and which are criteria, then
    /// assign dense output indices in file order.
    ///
    /// `None` selects every sensor for that role.
    pub fn filter<S: AsRef<str>>(&mut self, keep: Option<&[S]>, criteria: Option<&[S]>) {
        let listed = |names: Option<&[S]>, name: &str| {
            names.map_or(true, |names| names.iter().any(|n| n.as_ref() == name))
        };

        for sensor in &mut self.sensors {
            sensor.keep = listed(keep, &sensor.name);
            sensor.is_criterion = listed(criteria, &sensor.name);
        }
        self.assign_output_indices();
    }

    fn assign_output_indices(&mut self) {
        let mut next = 0;
        for sensor in &mut self.sensors {
            sensor.output_index = if sensor.keep {
                next += 1;
                Some(next - 1)
            } else {
                None
            };
        }
        self.n_output = next;
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn sensors(&self) -> &[SensorDescriptor] {
        &self.sensors
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorDescriptor> {
        self.sensors.iter()
    }

    pub fn get(&self, name: &str) -> Option<&SensorDescriptor> {
        self.by_name.get(name).map(|&i| &self.sensors[i])
    }

    pub fn by_file_index(&self, file_index: usize) -> Option<&SensorDescriptor> {
        self.by_file_index.get(&file_index).map(|&i| &self.sensors[i])
    }

    pub fn source(&self) -> &CatalogSource {
        &self.source
    }

    /// Number of sensors with an output column
    pub fn n_output(&self) -> usize {
        self.n_output
    }

    /// Sensors with an output column, in output order
    pub fn output_sensors(&self) -> impl Iterator<Item = &SensorDescriptor> {
        self.sensors.iter().filter(|s| s.output_index.is_some())
    }

    pub fn names(&self) -> Vec<String> {
        self.sensors.iter().map(|s| s.name.clone()).collect()
    }

    /// Bytes of 2-bit codes at the start of each record
    pub fn header_bytes(&self) -> usize {
        (self.sensors.len() + 3) / 4
    }
}
