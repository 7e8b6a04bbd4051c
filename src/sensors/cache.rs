// src/sensors/cache.rs
use crate::error::{DbdError, Result};
use crate::sensors::SensorDescriptor;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A parsed cache file
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// File the list was read from
    pub path: PathBuf,
    /// Available sensors, in list order
    pub sensors: Vec<SensorDescriptor>,
}

type CachedList = Option<Arc<CacheEntry>>;

/// Read-only view of a sensor cache directory
///
/// Cache files are named by the sensor-list CRC (`<crc>`, `<crc>.cac` or
/// `<crc>.ccc`, matched case-insensitively) and hold the same `s:` lines
/// an unfactored file carries inline. Parsed lists, and misses, are
/// remembered so that concurrent readers resolve each CRC once.
#[derive(Debug)]
pub struct SensorCache {
    dir: PathBuf,
    loaded: RwLock<HashMap<String, CachedList>>,
}

impl SensorCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SensorCache {
            dir: dir.into(),
            loaded: RwLock::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Locate the cache file for `crc`, if present
    pub fn find_file(&self, crc: &str) -> Option<PathBuf> {
        let crc = crc.to_lowercase();
        if crc.is_empty() {
            return None;
        }
        let candidates = [crc.clone(), format!("{}.cac", crc), format!("{}.ccc", crc)];

        let entries = fs::read_dir(&self.dir).ok()?;
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map_or(false, |t| t.is_file()))
            .find(|entry| {
                let name = entry.file_name().to_string_lossy().to_lowercase();
                candidates.contains(&name)
            })
            .map(|entry| entry.path())
    }

    pub fn contains(&self, crc: &str) -> bool {
        if let Some(entry) = self.loaded.read().get(&crc.to_lowercase()) {
            return entry.is_some();
        }
        self.find_file(crc).is_some()
    }

    /// Load the available sensors listed for `crc`, with the file they
    /// came from. The directory is searched once per CRC.
    pub fn load(&self, crc: &str) -> Result<Arc<CacheEntry>> {
        let key = crc.to_lowercase();
        if let Some(entry) = self.loaded.read().get(&key) {
            return entry.clone().ok_or_else(|| self.not_found(crc));
        }

        let loaded = match self.find_file(&key) {
            Some(path) => {
                let sensors = Self::read_file(&path)?;
                log::debug!("Loaded {} sensors from cache file {:?}", sensors.len(), path);
                Some(Arc::new(CacheEntry { path, sensors }))
            }
            None => None,
        };

        self.loaded.write().insert(key, loaded.clone());
        loaded.ok_or_else(|| self.not_found(crc))
    }

    fn not_found(&self, crc: &str) -> DbdError {
        DbdError::CacheNotFound {
            crc: crc.to_string(),
            dir: self.dir.clone(),
        }
    }

    fn read_file(path: &Path) -> Result<Vec<SensorDescriptor>> {
        let bytes = fs::read(path)?;
        Ok(Self::parse_text(&String::from_utf8_lossy(&bytes)))
    }

    /// Parse cache file contents, keeping only available sensors.
    ///
    /// Unavailable sensors never carry values in factored files, so they
    /// are dropped here.
    pub fn parse_text(text: &str) -> Vec<SensorDescriptor> {
        text.lines()
            .map(str::trim)
            .filter(|line| line.starts_with("s:"))
            .filter_map(|line| match SensorDescriptor::parse_line(line) {
                Ok(sensor) => Some(sensor),
                Err(e) => {
                    log::warn!("Skipping cache line: {}", e);
                    None
                }
            })
            .filter(|sensor| sensor.available)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CACHE_TEXT: &str = "s: T 0 0 8 m_present_time timestamp\n\
                              s: F 1 -1 4 m_unused nodim\n\
                              s: T 2 1 4 m_depth m\n";

    #[test]
    fn test_parse_text_keeps_available_only() {
        let sensors = SensorCache::parse_text(CACHE_TEXT);
        let names: Vec<_> = sensors.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["m_present_time", "m_depth"]);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ABCD1234.CAC"), CACHE_TEXT).unwrap();
        let cache = SensorCache::new(dir.path());

        assert!(cache.contains("abcd1234"));
        let entry = cache.load("AbCd1234").unwrap();
        assert_eq!(entry.sensors.len(), 2);
        assert_eq!(entry.path, dir.path().join("ABCD1234.CAC"));
        assert!(Arc::ptr_eq(&entry, &cache.load("abcd1234").unwrap()));
    }

    #[test]
    fn test_ccc_and_bare_names() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("1111.ccc"), CACHE_TEXT).unwrap();
        fs::write(dir.path().join("2222"), CACHE_TEXT).unwrap();
        let cache = SensorCache::new(dir.path());

        assert_eq!(cache.load("1111").unwrap().sensors.len(), 2);
        assert_eq!(cache.load("2222").unwrap().sensors.len(), 2);
    }

    #[test]
    fn test_missing_entry() {
        let dir = tempdir().unwrap();
        let cache = SensorCache::new(dir.path());
        assert!(matches!(cache.load("deadbeef"), Err(DbdError::CacheNotFound { .. })));
        assert!(matches!(cache.load("deadbeef"), Err(DbdError::CacheNotFound { .. })));

        let missing_dir = SensorCache::new(dir.path().join("nope"));
        assert!(!missing_dir.contains("deadbeef"));
    }

    #[test]
    fn test_resolved_path_is_remembered() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("abcd1234.cac"), CACHE_TEXT).unwrap();
        let cache = SensorCache::new(dir.path());
        let entry = cache.load("abcd1234").unwrap();

        // Later lookups answer from memory, even once the file is gone
        fs::remove_file(dir.path().join("abcd1234.cac")).unwrap();
        assert!(cache.contains("ABCD1234"));
        assert_eq!(cache.load("abcd1234").unwrap().path, entry.path);
        assert!(cache.find_file("abcd1234").is_none());
    }
}
