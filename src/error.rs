// src/error.rs
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbdError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Framing error: {0}")]
    Framing(String),

    #[error("Empty or invalid header")]
    InvalidHeader,

    #[error("Incomplete sensor list: expected {expected} sensors, found {found}")]
    IncompleteSensorList { expected: usize, found: usize },

    #[error("Sensor cache entry {crc} not found in {}", dir.display())]
    CacheNotFound { crc: String, dir: PathBuf },

    #[error("Invalid known bytes: {0}")]
    InvalidMagicBytes(String),

    #[error("Truncated data record {record}")]
    TruncatedRecord { record: usize },

    #[error("Unexpected tag {tag:#04x} before data record {record}")]
    UnexpectedTag { tag: u8, record: usize },

    #[error("Sensor {sensor} is {found} bytes wide, previously seen as {expected} bytes")]
    SchemaConflict { sensor: String, expected: usize, found: usize },

    #[error("Unsupported sensor size: {0}")]
    UnsupportedSensorSize(usize),

    #[error("Invalid sensor line: {0}")]
    InvalidSensorLine(String),

    #[error("Cannot specify both mission include and exclude lists")]
    ConflictingMissionFilters,

    #[error("No sensors found for {}", .0.display())]
    NoSensors(PathBuf),

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Invalid netCDF container: {0}")]
    InvalidContainer(String),

    #[error("Writer closed")]
    WriterClosed,
}

impl DbdError {
    /// Whether decoding of the file may continue after this condition
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DbdError::IncompleteSensorList { .. }
                | DbdError::TruncatedRecord { .. }
                | DbdError::UnexpectedTag { .. }
                | DbdError::SchemaConflict { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DbdError>;
