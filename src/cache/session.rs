//! Save-on-exit guard for a batch of lookups

use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use tracing::info;

use super::manager::{CacheStats, GeocodeCache};

/// Holds a `GeocodeCache` for the length of a batch and saves it when dropped
///
/// The save also runs on early return and panic unwind, so results gathered
/// before an interruption are kept. Use `close` to save explicitly and get
/// the final statistics back.
#[derive(Debug)]
pub struct CacheSession {
    cache: GeocodeCache,
    saved: bool,
}

impl CacheSession {
    /// Opens the cache at `path` for a batch
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(GeocodeCache::open(path))
    }

    /// Wraps an already opened cache
    pub fn new(cache: GeocodeCache) -> Self {
        Self {
            cache,
            saved: false,
        }
    }

    /// Saves the cache and ends the session
    pub fn close(mut self) -> CacheStats {
        self.finish()
    }

    fn finish(&mut self) -> CacheStats {
        let stats = self.cache.stats();
        if !self.saved {
            self.saved = true;
            self.cache.save();
            info!(%stats, "Geocode cache stats");
        }
        stats
    }
}

impl Deref for CacheSession {
    type Target = GeocodeCache;

    fn deref(&self) -> &GeocodeCache {
        &self.cache
    }
}

impl DerefMut for CacheSession {
    fn deref_mut(&mut self) -> &mut GeocodeCache {
        &mut self.cache
    }
}

impl Drop for CacheSession {
    fn drop(&mut self) {
        self.finish();
    }
}
