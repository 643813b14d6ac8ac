//! Persistent geocode store
//!
//! Provides a `GeocodeCache` that keeps every geocoded address in a single JSON
//! file. The whole file is loaded at startup and rewritten on save.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::normalize::{key_for_normalized, normalize_address};
use crate::geocode::Coordinates;

/// Version tag written into new cache files
pub const CACHE_VERSION: &str = "1.0";

/// Errors that can occur when persisting the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the backing file failed
    #[error("Cache file I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store could not be converted to or from JSON
    #[error("Invalid cache JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A single cached geocode result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Address as originally supplied
    pub address: String,
    /// Normalized form the key was derived from
    pub normalized: String,
    /// Latitude coordinate
    pub latitude: f64,
    /// Longitude coordinate
    pub longitude: f64,
    /// When the entry was written (local time)
    pub cached_at: NaiveDateTime,
}

impl CacheEntry {
    /// Returns the entry's coordinate pair
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// On-disk layout of the cache file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheStore {
    version: String,
    created: NaiveDateTime,
    last_updated: NaiveDateTime,
    #[serde(default)]
    addresses: BTreeMap<String, CacheEntry>,
}

impl CacheStore {
    fn fresh() -> Self {
        let now = now();
        Self {
            version: CACHE_VERSION.to_string(),
            created: now,
            last_updated: now,
            addresses: BTreeMap::new(),
        }
    }
}

/// Lookup statistics for the current process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in the store
    pub total_cached: usize,
    /// Lookups that found an entry
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate as a percentage, or `None` before any lookup
    pub fn hit_rate(&self) -> Option<f64> {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            None
        } else {
            Some(self.hits as f64 / lookups as f64 * 100.0)
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hits, {} misses, ", self.hits, self.misses)?;
        match self.hit_rate() {
            Some(rate) => write!(f, "{:.1}% hit rate", rate),
            None => write!(f, "N/A hit rate"),
        }
    }
}

/// Persistent cache mapping normalized addresses to coordinates
///
/// The store is shared across runs and dataset years. Loading never fails: a
/// missing or unreadable file yields an empty store. Hit and miss counters
/// cover the current process only.
#[derive(Debug)]
pub struct GeocodeCache {
    /// Backing JSON file
    path: PathBuf,
    store: CacheStore,
    hits: u64,
    misses: u64,
}

impl GeocodeCache {
    /// Opens the cache backed by `path`
    ///
    /// Reads and parses the file if it exists. Any read or parse failure is
    /// logged as a warning and replaced by a fresh empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let store = match load_store(&path) {
            Ok(Some(store)) => {
                info!(
                    path = %path.display(),
                    addresses = store.addresses.len(),
                    "Loaded geocode cache"
                );
                store
            }
            Ok(None) => {
                info!(path = %path.display(), "Creating new geocode cache");
                CacheStore::fresh()
            }
            Err(e) => {
                warn!(error = %e, "Could not load geocode cache, starting empty");
                CacheStore::fresh()
            }
        };

        Self {
            path,
            store,
            hits: 0,
            misses: 0,
        }
    }

    /// Looks up cached coordinates for an address
    ///
    /// # Returns
    /// * `Some(Coordinates)` on a hit
    /// * `None` on a miss (counted, not an error)
    pub fn get(&mut self, address: &str) -> Option<Coordinates> {
        let key = key_for_normalized(&normalize_address(address));
        match self.store.addresses.get(&key) {
            Some(entry) => {
                self.hits += 1;
                Some(entry.coordinates())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Stores coordinates for an address, replacing any existing entry
    ///
    /// Non-finite coordinates are skipped with a warning: JSON has no NaN or
    /// infinity, so storing one would make the saved file unreadable.
    pub fn set(&mut self, address: &str, latitude: f64, longitude: f64) {
        if !latitude.is_finite() || !longitude.is_finite() {
            warn!(%address, latitude, longitude, "Not caching non-finite coordinates");
            return;
        }

        let normalized = normalize_address(address);
        let key = key_for_normalized(&normalized);
        let now = now();

        debug!(%key, %normalized, latitude, longitude, "Caching geocode");
        self.store.addresses.insert(
            key,
            CacheEntry {
                address: address.to_string(),
                normalized,
                latitude,
                longitude,
                cached_at: now,
            },
        );
        self.store.last_updated = now;
    }

    /// Returns the stored entry for an address without touching the counters
    pub fn entry(&self, address: &str) -> Option<&CacheEntry> {
        self.store.addresses.get(&key_for_normalized(&normalize_address(address)))
    }

    /// Writes the whole store to disk, creating parent directories as needed
    pub fn try_save(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(&self.store)?;
        fs::write(&self.path, json).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes the store to disk, logging instead of failing
    ///
    /// # Returns
    /// * `true` if the file was written
    /// * `false` if writing failed; in-memory state is kept
    pub fn save(&self) -> bool {
        match self.try_save() {
            Ok(()) => {
                info!(
                    path = %self.path.display(),
                    addresses = self.len(),
                    "Geocode cache saved"
                );
                true
            }
            Err(e) => {
                warn!(error = %e, "Could not save geocode cache");
                false
            }
        }
    }

    /// Returns lookup statistics for this process
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_cached: self.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }

    /// Number of cached addresses
    pub fn len(&self) -> usize {
        self.store.addresses.len()
    }

    /// Whether the store holds no addresses
    pub fn is_empty(&self) -> bool {
        self.store.addresses.is_empty()
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format version of the store
    pub fn version(&self) -> &str {
        &self.store.version
    }

    /// When the store was first created
    pub fn created(&self) -> NaiveDateTime {
        self.store.created
    }

    /// When an entry was last written
    pub fn last_updated(&self) -> NaiveDateTime {
        self.store.last_updated
    }
}

/// Reads the store from disk; `Ok(None)` when no file exists
fn load_store(path: &Path) -> Result<Option<CacheStore>, CacheError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let store = serde_json::from_str(&content)?;
    Ok(Some(store))
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_cache() -> (GeocodeCache, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = GeocodeCache::open(temp_dir.path().join("geocode_cache.json"));
        (cache, temp_dir)
    }

    #[test]
    fn test_open_missing_file_creates_empty_store() {
        let (cache, temp_dir) = create_test_cache();

        assert!(cache.is_empty());
        assert_eq!(cache.version(), CACHE_VERSION);
        assert!(cache.created() <= cache.last_updated());
        assert!(
            !temp_dir.path().join("geocode_cache.json").exists(),
            "Opening should not write the file"
        );
    }

    #[test]
    fn test_get_on_fresh_store_counts_miss() {
        let (mut cache, _temp_dir) = create_test_cache();

        assert!(cache.get("123 Main St").is_none());

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_set_then_get_returns_coordinates() {
        let (mut cache, _temp_dir) = create_test_cache();

        cache.set("1 Oak Ln", 30.1, -97.8);

        assert_eq!(cache.get("1 Oak Ln"), Some(Coordinates::new(30.1, -97.8)));
        assert!(cache.get("1 Oak Drive").is_none());
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_address_variants_share_one_entry() {
        let (mut cache, _temp_dir) = create_test_cache();

        cache.set("123 Main Street, Cedar Park, TX", 30.505, -97.82);

        for address in [
            "123 Main Street, Cedar Park, TX",
            "123 main st, cedar park, texas",
            "123 Main St., Cedar Park, TX",
        ] {
            assert_eq!(
                cache.get(address),
                Some(Coordinates::new(30.505, -97.82)),
                "Lookup of '{}' should hit",
                address
            );
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_set_records_original_and_normalized() {
        let (mut cache, _temp_dir) = create_test_cache();

        let before = now();
        cache.set("9 Elm Road, Leander, TX", 30.57, -97.85);
        let after = now();

        let entry = cache.entry("9 elm rd leander tx").expect("Entry should exist");
        assert_eq!(entry.address, "9 Elm Road, Leander, TX");
        assert_eq!(entry.normalized, "9 elm rd leander tx");
        assert!(entry.cached_at >= before && entry.cached_at <= after);
        assert!(cache.last_updated() >= before);
    }

    #[test]
    fn test_set_twice_is_idempotent() {
        let (mut cache, _temp_dir) = create_test_cache();

        cache.set("1 Oak Ln", 30.1, -97.8);
        cache.set("1 Oak Ln", 30.1, -97.8);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("1 Oak Ln"), Some(Coordinates::new(30.1, -97.8)));
    }

    #[test]
    fn test_set_overwrites_existing_entry() {
        let (mut cache, _temp_dir) = create_test_cache();

        cache.set("1 Oak Ln", 30.1, -97.8);
        cache.set("1 oak lane", 30.2, -97.9);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("1 Oak Ln"), Some(Coordinates::new(30.2, -97.9)));
        assert_eq!(cache.entry("1 Oak Ln").unwrap().address, "1 oak lane");
    }

    #[test]
    fn test_non_finite_set_keeps_saved_store_readable() {
        let (mut cache, temp_dir) = create_test_cache();
        cache.set("1 Oak Ln", 30.1, -97.8);
        cache.set("2 Pine Ct", 30.2, -97.7);

        cache.set("2 Pine Ct", f64::NAN, -97.7);
        cache.set("3 Elm Rd", 30.3, f64::INFINITY);
        cache.set("4 Ash Ct", f64::NEG_INFINITY, -97.6);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("2 Pine Ct"), Some(Coordinates::new(30.2, -97.7)));
        assert!(cache.save());

        let mut reopened = GeocodeCache::open(temp_dir.path().join("geocode_cache.json"));
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get("1 Oak Ln"), Some(Coordinates::new(30.1, -97.8)));
        assert_eq!(reopened.get("2 Pine Ct"), Some(Coordinates::new(30.2, -97.7)));
        assert!(reopened.get("3 Elm Rd").is_none());
    }

    #[test]
    fn test_save_then_open_round_trips() {
        let (mut cache, temp_dir) = create_test_cache();
        cache.set("1 Oak Ln", 30.1, -97.8);
        cache.set("123 Main Street, Cedar Park, TX", 30.505, -97.82);

        assert!(cache.save());

        let mut reopened = GeocodeCache::open(temp_dir.path().join("geocode_cache.json"));
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.created(), cache.created());
        assert_eq!(reopened.get("1 Oak Ln"), Some(Coordinates::new(30.1, -97.8)));
        assert_eq!(
            reopened.get("123 main st cedar park tx"),
            Some(Coordinates::new(30.505, -97.82))
        );
        // Counters start over in a new process
        assert_eq!(reopened.stats().hits, 2);
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("nested").join("data").join("cache.json");
        let mut cache = GeocodeCache::open(&path);
        cache.set("1 Oak Ln", 30.1, -97.8);

        assert!(cache.save());
        assert!(path.exists(), "Cache file should be created");
    }

    #[test]
    fn test_saved_file_layout() {
        let (mut cache, temp_dir) = create_test_cache();
        cache.set("1 Oak Ln", 30.1, -97.8);
        cache.save();

        let content = fs::read_to_string(temp_dir.path().join("geocode_cache.json"))
            .expect("Should read file");
        let json: serde_json::Value = serde_json::from_str(&content).expect("Valid JSON");

        assert_eq!(json["version"], "1.0");
        assert!(json["created"].is_string());
        assert!(json["last_updated"].is_string());
        let entry = &json["addresses"][crate::cache::cache_key("1 Oak Ln")];
        assert_eq!(entry["address"], "1 Oak Ln");
        assert_eq!(entry["normalized"], "1 oak ln");
        assert_eq!(entry["latitude"], 30.1);
        assert_eq!(entry["longitude"], -97.8);
        assert!(entry["cached_at"].is_string());
    }

    #[test]
    fn test_corrupted_file_falls_back_to_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("geocode_cache.json");
        fs::write(&path, "{ not json").unwrap();

        let mut cache = GeocodeCache::open(&path);

        assert!(cache.is_empty());
        assert!(cache.get("1 Oak Ln").is_none());
    }

    #[test]
    fn test_loads_file_with_python_style_timestamps() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("geocode_cache.json");
        let key = crate::cache::cache_key("1 Oak Ln");
        let content = format!(
            r#"{{
                "version": "1.0",
                "created": "2024-12-01T09:30:00.123456",
                "last_updated": "2024-12-02T10:00:00",
                "addresses": {{
                    "{}": {{
                        "address": "1 Oak Ln",
                        "normalized": "1 oak ln",
                        "latitude": 30.1,
                        "longitude": -97.8,
                        "cached_at": "2024-12-02T10:00:00"
                    }}
                }}
            }}"#,
            key
        );
        fs::write(&path, content).unwrap();

        let mut cache = GeocodeCache::open(&path);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("1 Oak Lane"), Some(Coordinates::new(30.1, -97.8)));
    }

    #[test]
    fn test_save_failure_is_reported_not_raised() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        // A directory in place of the file makes the write fail
        let path = temp_dir.path().join("occupied");
        fs::create_dir(&path).unwrap();
        let mut cache = GeocodeCache::open(&path);
        cache.set("1 Oak Ln", 30.1, -97.8);

        assert!(!cache.save());
        assert!(matches!(cache.try_save(), Err(CacheError::Io { .. })));
        assert_eq!(cache.get("1 Oak Ln"), Some(Coordinates::new(30.1, -97.8)));
    }

    #[test]
    fn test_stats_hit_rate() {
        let stats = CacheStats {
            total_cached: 3,
            hits: 3,
            misses: 1,
        };
        assert_eq!(stats.hit_rate(), Some(75.0));
        assert_eq!(stats.to_string(), "3 hits, 1 misses, 75.0% hit rate");

        let empty = CacheStats {
            total_cached: 0,
            hits: 0,
            misses: 0,
        };
        assert!(empty.hit_rate().is_none());
        assert_eq!(empty.to_string(), "0 hits, 0 misses, N/A hit rate");
    }
}
