// src/sensors/mod.rs
//! Sensor descriptors, per-file catalogs and the on-disk sensor cache
//!
//! Each sensor is described by one text line:
//!
//! ```text
//! s: T 0 0 8 m_present_time timestamp
//!    |  | | |  |              `-- units
//!    |  | | |  `-- name
//!    |  | | `-- byte width (1, 2, 4 or 8)
//!    |  | `-- storage index
//!    |  `-- file index
//!    `-- available in this firmware build (T/F)
//! ```
//!
//! Files with a factored sensor list omit these lines; the list is then
//! read from `<cache_dir>/<sensor_list_crc>.cac`.

mod descriptor;
mod catalog;
mod cache;

pub use descriptor::SensorDescriptor;
pub use catalog::{CatalogSource, SensorCatalog};
pub use cache::{CacheEntry, SensorCache};
