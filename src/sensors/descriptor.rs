// src/sensors/descriptor.rs
use crate::error::{DbdError, Result};
use crate::types::SensorType;
use std::fmt;
use std::str::FromStr;

/// One entry of a file's sensor list
#[derive(Debug, Clone, PartialEq)]
pub struct SensorDescriptor {
    pub name: String,
    pub units: String,
    pub sensor_type: SensorType,
    /// Whether the sensor exists in this firmware build
    pub available: bool,
    /// Position in the file's sensor list
    pub file_index: usize,
    /// Index in the glider's global sensor table (-1 when unused)
    pub storage_index: i64,
    /// Emit this sensor as an output column
    pub keep: bool,
    /// A new or repeated value for this sensor makes the record eligible
    pub is_criterion: bool,
    /// Dense output column, assigned by [`SensorCatalog::filter`](crate::sensors::SensorCatalog::filter)
    pub output_index: Option<usize>,
}

impl SensorDescriptor {
    pub fn new(name: impl Into<String>, units: impl Into<String>, sensor_type: SensorType, file_index: usize) -> Self {
        SensorDescriptor {
            name: name.into(),
            units: units.into(),
            sensor_type,
            available: true,
            file_index,
            storage_index: file_index as i64,
            keep: true,
            is_criterion: true,
            output_index: None,
        }
    }

    /// Parse an `s: <T|F> <file index> <storage index> <width> <name> <units>` line
    pub fn parse_line(line: &str) -> Result<Self> {
        let invalid = || DbdError::InvalidSensorLine(line.to_string());

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 7 || parts[0] != "s:" {
            return Err(invalid());
        }

        let available = match parts[1] {
            "T" => true,
            "F" => false,
            _ => return Err(invalid()),
        };
        let file_index: usize = parts[2].parse().map_err(|_| invalid())?;
        let storage_index: i64 = parts[3].parse().map_err(|_| invalid())?;
        let width: usize = parts[4].parse().map_err(|_| invalid())?;
        let sensor_type = SensorType::from_width(width).ok_or(DbdError::UnsupportedSensorSize(width))?;

        Ok(SensorDescriptor {
            name: parts[5].to_string(),
            units: parts[6].to_string(),
            sensor_type,
            available,
            file_index,
            storage_index,
            keep: true,
            is_criterion: true,
            output_index: None,
        })
    }

    pub fn width(&self) -> usize {
        self.sensor_type.width()
    }
}

impl FromStr for SensorDescriptor {
    type Err = DbdError;

    fn from_str(s: &str) -> Result<Self> {
        SensorDescriptor::parse_line(s)
    }
}

/// Formats the descriptor back into its sensor-list line
impl fmt::Display for SensorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "s: {} {} {} {} {} {}",
            if self.available { "T" } else { "F" },
            self.file_index,
            self.storage_index,
            self.width(),
            self.name,
            self.units
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let s = SensorDescriptor::parse_line("s: T 3 17 4 m_depth m").unwrap();
        assert!(s.available);
        assert_eq!(s.file_index, 3);
        assert_eq!(s.storage_index, 17);
        assert_eq!(s.sensor_type, SensorType::F32);
        assert_eq!(s.name, "m_depth");
        assert_eq!(s.units, "m");
        assert!(s.keep && s.is_criterion);
        assert_eq!(s.output_index, None);

        let unused = SensorDescriptor::parse_line("s: F 4 -1 1 c_wpt_lat nodim").unwrap();
        assert!(!unused.available);
        assert_eq!(unused.storage_index, -1);
    }

    #[test]
    fn test_reject_malformed_lines() {
        assert!(SensorDescriptor::parse_line("s: T 0 0 8 m_present_time").is_err());
        assert!(SensorDescriptor::parse_line("x: T 0 0 8 a b").is_err());
        assert!(SensorDescriptor::parse_line("s: Y 0 0 8 a b").is_err());
        assert!(SensorDescriptor::parse_line("s: T zero 0 8 a b").is_err());
        assert!(matches!(
            SensorDescriptor::parse_line("s: T 0 0 3 a b"),
            Err(DbdError::UnsupportedSensorSize(3))
        ));
    }

    #[test]
    fn test_display_round_trips() {
        let line = "s: T 0 0 8 m_present_time timestamp";
        let s: SensorDescriptor = line.parse().unwrap();
        assert_eq!(s.to_string(), line);
    }
}
