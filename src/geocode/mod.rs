//! Cache-first geocoding of pickup addresses
//!
//! This module contains the coordinate type shared with the cache, the
//! `Geocoder` seam used by the batch driver, and the Google Maps client that
//! implements it.

pub mod api_key;
pub mod driver;
pub mod google;

pub use api_key::{resolve_api_key, ApiKey, ApiKeyError, ApiKeySource};
pub use driver::{geocode_address, geocode_batch, BatchReport, GeocodeOutcome, LookupSource};
pub use google::GoogleGeocoder;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use thiserror::Error;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude coordinate
    pub latitude: f64,
    /// Longitude coordinate
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Errors that can occur when calling a geocoding service
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// The service rejected the request
    #[error("Geocoding API returned {status}: {message}")]
    Api { status: String, message: String },
}

/// A service that turns a free-text address into coordinates
pub trait Geocoder {
    /// Geocodes a single address
    ///
    /// # Returns
    /// * `Ok(Some(Coordinates))` - The best match for the address
    /// * `Ok(None)` - The service found no match
    /// * `Err(GeocodeError)` - The request or response was unusable
    fn geocode(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Coordinates>, GeocodeError>> + Send;
}

/// Builds a full address from its parts and a state
///
/// Empty parts are skipped. The state is appended unless the last
/// comma-separated token already is the state (ignoring case).
///
/// # Example
/// `full_address(&["12", "Oak Ln", "Cedar Park"], "TX")` gives
/// `"12, Oak Ln, Cedar Park, TX"`.
pub fn full_address(parts: &[&str], state: &str) -> String {
    let mut pieces: Vec<&str> = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();

    let state = state.trim();
    let has_state = pieces
        .last()
        .and_then(|last| last.rsplit(',').next())
        .is_some_and(|token| token.trim().eq_ignore_ascii_case(state));
    if !state.is_empty() && !has_state {
        pieces.push(state);
    }

    pieces.join(", ")
}
