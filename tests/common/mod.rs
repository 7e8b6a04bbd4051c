// tests/common/mod.rs
#![allow(dead_code)]

use dbd_rs::framing::is_compressed;
use dbd_rs::known_bytes::KnownBytes;
use std::fs;
use std::path::{Path, PathBuf};

/// One cell of a synthesized record
#[derive(Debug, Clone, Copy)]
pub enum Cell {
    Absent,
    Repeat,
    New(f64),
}

#[derive(Debug, Clone)]
pub struct FixtureSensor {
    pub name: String,
    pub units: String,
    pub width: usize,
    pub available: bool,
}

/// Builds the bytes of a DBD file
#[derive(Debug, Clone)]
pub struct DbdFixture {
    pub mission: String,
    pub crc: String,
    pub factored: bool,
    /// Write the `s:` lines even when the list is factored
    pub embed_list: bool,
    pub flip_bytes: bool,
    pub sensors: Vec<FixtureSensor>,
    /// Overrides `total_num_sensors` in the header
    pub declared_sensors: Option<usize>,
    pub end_tag: bool,
    body: Vec<u8>,
}

impl DbdFixture {
    /// An unfactored file with the given `(name, units, width)` sensors
    pub fn new(mission: &str, sensors: &[(&str, &str, usize)]) -> Self {
        DbdFixture {
            mission: mission.to_string(),
            crc: "1a2b3c4d".to_string(),
            factored: false,
            embed_list: true,
            flip_bytes: false,
            sensors: sensors
                .iter()
                .map(|(name, units, width)| FixtureSensor {
                    name: name.to_string(),
                    units: units.to_string(),
                    width: *width,
                    available: true,
                })
                .collect(),
            declared_sensors: None,
            end_tag: true,
            body: Vec::new(),
        }
    }

    /// The usual time/depth pair
    pub fn time_depth(mission: &str) -> Self {
        Self::new(mission, &[("m_present_time", "timestamp", 8), ("m_depth", "m", 4)])
    }

    /// Leave the sensor list out of the file; it must come from the cache
    pub fn factored(mut self, crc: &str) -> Self {
        self.crc = crc.to_string();
        self.factored = true;
        self.embed_list = false;
        self
    }

    pub fn big_endian(mut self) -> Self {
        self.flip_bytes = true;
        self
    }

    pub fn without_end_tag(mut self) -> Self {
        self.end_tag = false;
        self
    }

    /// Append one `d` record; `cells` has one entry per sensor
    pub fn record(&mut self, cells: &[Cell]) -> &mut Self {
        assert_eq!(cells.len(), self.sensors.len(), "one cell per sensor");
        let mut bits = vec![0u8; (self.sensors.len() + 3) / 4];
        let mut values = Vec::new();

        for (i, (cell, sensor)) in cells.iter().zip(&self.sensors).enumerate() {
            let code = match cell {
                Cell::Absent => 0u8,
                Cell::Repeat => 1,
                Cell::New(v) => {
                    values.extend(encode_value(*v, sensor.width, self.flip_bytes));
                    2
                }
            };
            bits[i / 4] |= code << (6 - 2 * (i % 4));
        }

        self.body.push(b'd');
        self.body.extend(bits);
        self.body.extend(values);
        self
    }

    /// Append arbitrary bytes to the data section
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.body.extend_from_slice(bytes);
        self
    }

    /// A record with a new value for every sensor
    pub fn all_new(&mut self, values: &[f64]) -> &mut Self {
        let cells: Vec<Cell> = values.iter().map(|v| Cell::New(*v)).collect();
        self.record(&cells)
    }

    pub fn sensor_line(sensor: &FixtureSensor, index: usize) -> String {
        format!(
            "s: {} {} {} {} {} {}\n",
            if sensor.available { "T" } else { "F" },
            index,
            index,
            sensor.width,
            sensor.name,
            sensor.units
        )
    }

    /// Contents of the matching sensor cache file
    pub fn cache_text(&self) -> String {
        self.sensors
            .iter()
            .enumerate()
            .map(|(i, s)| Self::sensor_line(s, i))
            .collect()
    }

    /// Uncompressed file contents
    pub fn to_bytes(&self) -> Vec<u8> {
        let header = [
            ("dbd_label", "DBD(dinkum_binary_data)file".to_string()),
            ("encoding_ver", "5".to_string()),
            ("num_ascii_tags", "9".to_string()),
            ("mission_name", self.mission.clone()),
            ("fileopen_time", "Thu_Jan__1_00:00:00_1970".to_string()),
            (
                "total_num_sensors",
                self.declared_sensors.unwrap_or(self.sensors.len()).to_string(),
            ),
            ("sensor_list_crc", self.crc.clone()),
            ("sensor_list_factored", if self.factored { "1" } else { "0" }.to_string()),
            ("the8x3_filename", "01330000".to_string()),
        ];

        let mut out = Vec::new();
        for (key, value) in header {
            out.extend_from_slice(format!("{}:    {}\n", key, value).as_bytes());
        }
        if self.embed_list {
            out.extend_from_slice(self.cache_text().as_bytes());
        }
        out.extend_from_slice(&KnownBytes::encode(self.flip_bytes));
        out.extend_from_slice(&self.body);
        if self.end_tag {
            out.push(b'X');
        }
        out
    }

    /// Write the file into `dir`, LZ4-framing it when `name` has a
    /// compressed extension
    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let bytes = self.to_bytes();
        let bytes = if is_compressed(&path) {
            compress_frames(&bytes, 64)
        } else {
            bytes
        };
        fs::write(&path, bytes).unwrap();
        path
    }

    /// Write `<crc>.cac` into `cache_dir`
    pub fn write_cache(&self, cache_dir: &Path) -> PathBuf {
        fs::create_dir_all(cache_dir).unwrap();
        let path = cache_dir.join(format!("{}.cac", self.crc));
        fs::write(&path, self.cache_text()).unwrap();
        path
    }
}

fn encode_value(value: f64, width: usize, flip_bytes: bool) -> Vec<u8> {
    match (width, flip_bytes) {
        (1, _) => vec![value as i8 as u8],
        (2, false) => (value as i16).to_le_bytes().to_vec(),
        (2, true) => (value as i16).to_be_bytes().to_vec(),
        (4, false) => (value as f32).to_le_bytes().to_vec(),
        (4, true) => (value as f32).to_be_bytes().to_vec(),
        (8, false) => value.to_le_bytes().to_vec(),
        (8, true) => value.to_be_bytes().to_vec(),
        _ => panic!("unsupported width {}", width),
    }
}

/// Split `data` into LZ4 block frames of at most `frame_len` plain bytes
pub fn compress_frames(data: &[u8], frame_len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in data.chunks(frame_len) {
        let block = lz4_flex::block::compress(chunk);
        out.extend_from_slice(&(block.len() as u16).to_be_bytes());
        out.extend_from_slice(&block);
    }
    out
}

/// Install a test logger once
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
