//! Google Maps Geocoding API client

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{Coordinates, GeocodeError, Geocoder};

/// Base URL for the Google Geocoding API
const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Client for the Google Maps Geocoding API
#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    client: Client,
    api_key: String,
    /// Base URL for the API (allows override for testing)
    base_url: String,
}

impl GoogleGeocoder {
    /// Create a new GoogleGeocoder using the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: GOOGLE_GEOCODE_URL.to_string(),
        }
    }

    /// Use a custom HTTP client
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Use a custom endpoint instead of the public API
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch the best match for an address
    pub async fn fetch(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?;
        let text = response.text().await?;
        let api_response: GeocodeResponse = serde_json::from_str(&text)?;

        parse_response(api_response)
    }
}

impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        debug!(%address, "Calling Google geocoding API");
        self.fetch(address).await
    }
}

/// Map a Geocoding API response to the first result's location
fn parse_response(response: GeocodeResponse) -> Result<Option<Coordinates>, GeocodeError> {
    match response.status.as_str() {
        "OK" => Ok(response
            .results
            .first()
            .map(|r| Coordinates::new(r.geometry.location.lat, r.geometry.location.lng))),
        "ZERO_RESULTS" => Ok(None),
        _ => Err(GeocodeError::Api {
            status: response.status,
            message: response.error_message.unwrap_or_default(),
        }),
    }
}

/// Geocoding API response structure
#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}
