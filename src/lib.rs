// src/lib.rs
//! # dbd-rs
//!
//! A Rust library for decoding Slocum glider Dinkum Binary Data files
//! (`.dbd`, `.ebd`, `.sbd`, `.tbd`, `.mbd`, `.nbd` and their LZ4-compressed
//! `.dcd`-style variants) and converting them into netCDF.
//!
//! ## Features
//!
//! - **Compressed and plain input**: LZ4 frame decoding is transparent
//! - **Sensor caches**: factored files resolve their sensor lists from `.cac` files
//! - **Criteria filtering**: keep only records where chosen sensors were updated
//! - **Multi-file union**: files with different sensor sets merge onto one schema
//! - **Bounded memory**: the streaming writer decodes and writes in batches
//!
//! ## Quick Start
//!
//! ### Reading one file
//!
//! ```rust,no_run
//! use dbd_rs::*;
//!
//! fn main() -> Result<()> {
//!     let reader = DbdReader::open("01330000.dcd", &ReaderOptions::default())?;
//!
//!     for name in reader.column_names() {
//!         println!("Sensor: {}", name);
//!     }
//!
//!     if let Some(depth) = reader.column("m_depth") {
//!         println!("Read {} depths", depth.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Converting a deployment
//!
//! ```rust,no_run
//! use dbd_rs::*;
//!
//! fn main() -> Result<()> {
//!     let files = vec!["01330000.dcd", "01330001.dcd", "01330002.dcd"];
//!     let options = WriterOptions::default()
//!         .reader(ReaderOptions::new().skip_first_record(true).repair(true));
//!
//!     let summary = StreamingWriter::new(options).write_netcdf(&files, "deployment.nc")?;
//!     println!("{} records from {} files", summary.n_records, summary.n_files);
//!     Ok(())
//! }
//! ```

// Modules
pub mod error;
pub mod types;
pub mod framing;
pub mod header;
pub mod sensors;
pub mod known_bytes;
pub mod decoder;
pub mod schema;
pub mod netcdf;
pub mod writer;
pub mod reader;

mod utils;

// Re-export commonly used types at the crate root for convenience
pub use error::{DbdError, Result};

pub use types::{Column, ColumnSpec, ColumnValue, SensorType, FILL_INT16, FILL_INT8};

pub use header::{FileHeader, MissionFilter};

pub use sensors::{SensorCache, SensorCatalog, SensorDescriptor};

pub use decoder::DecodedBatch;

pub use schema::UnionSchema;

pub use netcdf::{NcReader, NcWriter};

// Writer exports
pub use writer::{ArraySink, MemorySink, StreamingWriter, WriteSummary, WriterOptions};

// Reader exports
pub use reader::{
    missing_cache_entries,
    read_multiple,
    scan_headers,
    DbdReader,
    HeaderScan,
    MultiRead,
    ReaderOptions,
};

// Prelude module for glob imports
pub mod prelude {
    //! Convenient imports for common use cases.
    //!
    //! ```rust
    //! use dbd_rs::prelude::*;
    //! ```

    pub use crate::error::{DbdError, Result};
    pub use crate::reader::{read_multiple, DbdReader, ReaderOptions};
    pub use crate::types::{Column, SensorType};
    pub use crate::writer::{StreamingWriter, WriterOptions};
}

/// The library version
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert!(!LIBRARY_VERSION.is_empty());
    }

    #[test]
    fn test_fill_values() {
        assert_eq!(FILL_INT8, -127);
        assert_eq!(FILL_INT16, i16::MIN);
        assert!(Column::filled(SensorType::F32, 2).to_f64_vec().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_sensor_type_sizes() {
        assert_eq!(SensorType::from_width(1), Some(SensorType::I8));
        assert_eq!(SensorType::from_width(2), Some(SensorType::I16));
        assert_eq!(SensorType::from_width(4), Some(SensorType::F32));
        assert_eq!(SensorType::from_width(8), Some(SensorType::F64));
        assert_eq!(SensorType::from_width(3), None);
    }
}
