// src/reader/scan.rs
use crate::framing::FramingReader;
use crate::header::{FileHeader, MissionFilter};
use crate::sensors::SensorCache;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Header summary of one file
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderScan {
    pub path: PathBuf,
    pub mission: String,
    pub sensor_list_crc: String,
    pub factored: bool,
    pub header: FileHeader,
}

/// Parse only the headers of `paths`, keeping files whose mission passes
/// `missions`. Unreadable files are logged and left out. Results follow
/// the sorted order of the paths.
pub fn scan_headers<P: AsRef<Path> + Sync>(paths: &[P], missions: &MissionFilter) -> Vec<HeaderScan> {
    let mut sorted: Vec<&Path> = paths.iter().map(|p| p.as_ref()).collect();
    sorted.sort();

    sorted
        .par_iter()
        .filter_map(|path| {
            let header = FramingReader::open(path).and_then(|mut r| FileHeader::parse(&mut r));
            match header {
                Ok(header) => Some(HeaderScan {
                    path: path.to_path_buf(),
                    mission: header.mission_name().to_string(),
                    sensor_list_crc: header.sensor_list_crc().to_string(),
                    factored: header.is_factored(),
                    header,
                }),
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    None
                }
            }
        })
        .filter(|scan| missions.accepts(&scan.mission))
        .collect()
}

/// Sensor-list CRCs of factored files that have no cache entry in
/// `cache_dir`, with the number of files needing each
pub fn missing_cache_entries(scans: &[HeaderScan], cache_dir: impl AsRef<Path>) -> Vec<(String, usize)> {
    let cache = SensorCache::new(cache_dir.as_ref());
    let mut missing: BTreeMap<String, usize> = BTreeMap::new();
    for scan in scans.iter().filter(|s| s.factored) {
        let crc = scan.sensor_list_crc.to_lowercase();
        if let Some(count) = missing.get_mut(&crc) {
            *count += 1;
        } else if !cache.contains(&crc) {
            missing.insert(crc, 1);
        }
    }
    missing.into_iter().collect()
}
