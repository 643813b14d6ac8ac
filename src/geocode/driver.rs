//! Cache-first geocoding of single addresses and batches

use serde::Serialize;
use tracing::{info, warn};

use super::{Coordinates, Geocoder};
use crate::cache::GeocodeCache;

/// Where a lookup's result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupSource {
    /// Found in the cache
    Cache,
    /// Fetched from the geocoding service and cached
    Api,
    /// No coordinates could be found
    Failed,
}

/// Result of geocoding one address
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeOutcome {
    /// The address as given
    pub address: String,
    /// Coordinates, if any were found
    pub coordinates: Option<Coordinates>,
    /// Where the coordinates came from
    pub source: LookupSource,
}

/// Summary of a batch run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// One outcome per processed address, in input order
    pub outcomes: Vec<GeocodeOutcome>,
    /// Number of requests sent to the geocoding service
    pub api_calls: usize,
    /// Number of addresses answered from the cache
    pub cache_hits: usize,
}

impl BatchReport {
    /// Number of addresses with coordinates
    pub fn successful(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.coordinates.is_some())
            .count()
    }

    /// Addresses that could not be geocoded
    pub fn failed(&self) -> impl Iterator<Item = &GeocodeOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.source == LookupSource::Failed)
    }
}

/// Geocodes a single address, consulting the cache first
///
/// On a miss the geocoder is called (when one is available) and a match is
/// written to the cache before returning. Service errors are logged and
/// reported as `LookupSource::Failed`; they never abort the caller.
pub async fn geocode_address<G: Geocoder>(
    address: &str,
    cache: &mut GeocodeCache,
    geocoder: Option<&G>,
) -> GeocodeOutcome {
    let outcome = |coordinates, source| GeocodeOutcome {
        address: address.to_string(),
        coordinates,
        source,
    };

    if let Some(coords) = cache.get(address) {
        return outcome(Some(coords), LookupSource::Cache);
    }

    let Some(geocoder) = geocoder else {
        return outcome(None, LookupSource::Failed);
    };

    match geocoder.geocode(address).await {
        Ok(Some(coords)) if !coords.latitude.is_finite() || !coords.longitude.is_finite() => {
            warn!(%address, %coords, "Geocoding returned non-finite coordinates");
            outcome(None, LookupSource::Failed)
        }
        Ok(Some(coords)) => {
            cache.set(address, coords.latitude, coords.longitude);
            outcome(Some(coords), LookupSource::Api)
        }
        Ok(None) => {
            warn!(%address, "No geocoding match");
            outcome(None, LookupSource::Failed)
        }
        Err(e) => {
            warn!(%address, error = %e, "Error geocoding address");
            outcome(None, LookupSource::Failed)
        }
    }
}

/// Geocodes addresses in order, one request at a time
///
/// # Arguments
/// * `addresses` - Addresses to geocode
/// * `cache` - Cache consulted before, and updated after, each request
/// * `geocoder` - Service used on cache misses; `None` runs cache-only
/// * `limit` - Process at most this many addresses; `Some(0)` means no limit
pub async fn geocode_batch<G: Geocoder>(
    addresses: &[String],
    cache: &mut GeocodeCache,
    geocoder: Option<&G>,
    limit: Option<usize>,
) -> BatchReport {
    let count = match limit {
        Some(n) if n > 0 => n.min(addresses.len()),
        _ => addresses.len(),
    };
    let mut report = BatchReport::default();

    for (i, address) in addresses.iter().take(count).enumerate() {
        let attempted_api = geocoder.is_some() && cache.entry(address).is_none();
        let outcome = geocode_address(address, cache, geocoder).await;

        if attempted_api {
            report.api_calls += 1;
        }
        if outcome.source == LookupSource::Cache {
            report.cache_hits += 1;
        }

        match outcome.coordinates {
            Some(coords) => info!(
                "[{}/{}] {:?} ok {}: {}",
                i + 1,
                count,
                outcome.source,
                address,
                coords
            ),
            None => warn!("[{}/{}] failed {}", i + 1, count, address),
        }
        report.outcomes.push(outcome);
    }

    info!(
        successful = report.successful(),
        total = count,
        api_calls = report.api_calls,
        cache_hits = report.cache_hits,
        "Geocoding complete"
    );
    report
}
