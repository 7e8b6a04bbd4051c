// src/header/mod.rs
//! The ASCII `key: value` block at the start of every DBD file
//!
//! ```text
//! dbd_label:    DBD(dinkum_binary_data)file
//! encoding_ver:    5
//! num_ascii_tags:    14
//! mission_name:    MICRO.MI
//! total_num_sensors:    1922
//! sensor_list_crc:    8E3F4C12
//! sensor_list_factored:    1
//! ...
//! ```

mod mission;

pub use mission::MissionFilter;

use crate::error::{DbdError, Result};
use crate::framing::FramingReader;
use crate::utils::decode_ascii_line;
use chrono::{NaiveDateTime, TimeZone, Utc};

/// Header line count assumed until `num_ascii_tags` is seen
const DEFAULT_HEADER_LINES: usize = 10;

/// Longest line examined while looking for header entries
const MAX_HEADER_LINE: usize = 4096;

/// Parsed file header, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileHeader {
    records: Vec<(String, String)>,
}

impl FileHeader {
    /// Parse header lines from a reader positioned at the start of a file.
    ///
    /// Stops after `num_ascii_tags` entries, or before the first line that
    /// is not ASCII or has no colon. The reader is left just after the last
    /// consumed header line.
    pub fn parse(reader: &mut FramingReader) -> Result<Self> {
        let mut header = FileHeader::default();
        let mut expected = DEFAULT_HEADER_LINES;

        while header.records.len() < expected {
            let raw = reader.peek_line(MAX_HEADER_LINE)?;
            if raw.is_empty() {
                break;
            }
            let consumed = raw.len();

            let line = match decode_ascii_line(raw) {
                Some(line) => line,
                None => break,
            };
            let (key, value) = match line.split_once(':') {
                Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
                None => break,
            };
            // The sensor list begins with "s:" lines; never treat those as header
            if key == "s" {
                break;
            }

            reader.skip(consumed)?;

            if key == "num_ascii_tags" {
                if let Ok(n) = value.parse::<usize>() {
                    expected = n;
                }
            }
            header.insert(key, value);
        }

        if header.is_empty() {
            return Err(DbdError::InvalidHeader);
        }
        Ok(header)
    }

    fn insert(&mut self, key: String, value: String) {
        match self.records.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.records.push((key, value)),
        }
    }

    /// Build a header from key/value pairs (used by tests and tools)
    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        let mut header = FileHeader::default();
        for (k, v) in pairs {
            header.insert(k.into(), v.into());
        }
        header
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.records
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn mission_name(&self) -> &str {
        self.get("mission_name").unwrap_or("")
    }

    /// Total number of sensors declared for the sensor list
    pub fn num_sensors(&self) -> usize {
        self.get_int("total_num_sensors")
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0)
    }

    pub fn sensor_list_crc(&self) -> &str {
        self.get("sensor_list_crc").unwrap_or("")
    }

    /// True when the sensor list was left out of the file and must come
    /// from the sensor cache
    pub fn is_factored(&self) -> bool {
        self.get_int("sensor_list_factored").unwrap_or(0) != 0
    }

    pub fn fileopen_time(&self) -> &str {
        self.get("fileopen_time").unwrap_or("")
    }

    pub fn encoding_version(&self) -> &str {
        self.get("encoding_ver").unwrap_or("")
    }

    pub fn full_filename(&self) -> &str {
        self.get("full_filename").unwrap_or("")
    }

    pub fn the8x3_filename(&self) -> &str {
        self.get("the8x3_filename").unwrap_or("")
    }

    pub fn filename_extension(&self) -> &str {
        self.get("filename_extension").unwrap_or("")
    }

    /// `fileopen_time` (e.g. `Thu_Jan__1_00:00:00_1970`) as seconds since
    /// the Unix epoch, UTC
    pub fn fileopen_epoch(&self) -> Option<i64> {
        let text = self.fileopen_time().replace('_', " ");
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let naive = NaiveDateTime::parse_from_str(&normalized, "%a %b %d %H:%M:%S %Y").ok()?;
        Some(Utc.from_utc_datetime(&naive).timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(bytes: &[u8]) -> FramingReader {
        FramingReader::new(Cursor::new(bytes.to_vec()), false)
    }

    #[test]
    fn test_parse_stops_at_declared_count() {
        let text = b"dbd_label: DBD(dinkum_binary_data)file\n\
                     num_ascii_tags: 3\n\
                     mission_name: MICRO.MI\n\
                     extra: not header\n";
        let mut r = reader(text);
        let header = FileHeader::parse(&mut r).unwrap();

        assert_eq!(header.len(), 3);
        assert_eq!(header.mission_name(), "MICRO.MI");
        assert_eq!(header.get("extra"), None);
        assert_eq!(r.read_line().unwrap(), b"extra: not header\n");
    }

    #[test]
    fn test_parse_stops_before_binary_and_sensor_lines() {
        let mut text = b"a: 1\nb: 2\n".to_vec();
        text.extend_from_slice(b"s: T 0 0 8 m_present_time timestamp\n");
        let mut r = reader(&text);
        let header = FileHeader::parse(&mut r).unwrap();
        assert_eq!(header.len(), 2);
        assert_eq!(r.position(), 10);

        let mut binary = b"a: 1\n".to_vec();
        binary.extend_from_slice(&[b's', b'a', 0x34, 0x12, 0xFF, 0xFE, b'\n']);
        let mut r = reader(&binary);
        let header = FileHeader::parse(&mut r).unwrap();
        assert_eq!(header.len(), 1);
        assert_eq!(r.position(), 5);
    }

    #[test]
    fn test_empty_header_is_invalid() {
        let mut r = reader(b"no colon here\n");
        assert!(matches!(FileHeader::parse(&mut r), Err(DbdError::InvalidHeader)));

        let mut r = reader(b"");
        assert!(matches!(FileHeader::parse(&mut r), Err(DbdError::InvalidHeader)));
    }

    #[test]
    fn test_derived_fields() {
        let header = FileHeader::from_pairs([
            ("total_num_sensors", "1922"),
            ("sensor_list_crc", "8E3F4C12"),
            ("sensor_list_factored", "1"),
            ("encoding_ver", "5"),
            ("fileopen_time", "Thu_Jan__1_00:00:00_1970"),
        ]);
        assert_eq!(header.num_sensors(), 1922);
        assert_eq!(header.sensor_list_crc(), "8E3F4C12");
        assert!(header.is_factored());
        assert_eq!(header.encoding_version(), "5");
        assert_eq!(header.fileopen_epoch(), Some(0));
        assert_eq!(header.mission_name(), "");
    }

    #[test]
    fn test_fileopen_epoch() {
        let header = FileHeader::from_pairs([("fileopen_time", "Sat_Jan__1_00:00:10_2000")]);
        assert_eq!(header.fileopen_epoch(), Some(946_684_810));

        let header = FileHeader::from_pairs([("fileopen_time", "garbage")]);
        assert_eq!(header.fileopen_epoch(), None);
    }
}
