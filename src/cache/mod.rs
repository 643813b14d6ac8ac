//! Persistent geocode cache
//!
//! This module maps normalized address strings to coordinates and persists
//! them to a single JSON file shared across runs. Lookups never fail: a
//! missing entry is a miss, and an unreadable file degrades to an empty cache.

mod manager;
mod normalize;
mod session;

use directories::ProjectDirs;
use std::path::PathBuf;

pub use manager::{CacheEntry, CacheError, CacheStats, GeocodeCache, CACHE_VERSION};
pub use normalize::{cache_key, normalize_address, CACHE_KEY_LEN};
pub use session::CacheSession;

/// File name of the cache inside the data directory
pub const CACHE_FILE_NAME: &str = "geocode_cache.json";

/// Returns the default location of the cache file
///
/// Uses the XDG data directory (`~/.local/share/treegeo/` on Linux). Falls
/// back to `data/geocode_cache.json` relative to the working directory when
/// no home directory can be determined.
pub fn default_cache_path() -> PathBuf {
    match ProjectDirs::from("", "", "treegeo") {
        Some(dirs) => dirs.data_dir().join(CACHE_FILE_NAME),
        None => PathBuf::from("data").join(CACHE_FILE_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_path_ends_with_file_name() {
        let path = default_cache_path();
        assert!(path.ends_with(CACHE_FILE_NAME));
        let path_str = path.to_string_lossy();
        assert!(
            path_str.contains("treegeo") || path_str.starts_with("data"),
            "Unexpected default path: {}",
            path_str
        );
    }
}
