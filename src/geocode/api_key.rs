//! Google Maps API key discovery
//!
//! Sources are tried in order: the `GOOGLE_MAPS_API_KEY` environment variable,
//! a `geocoding-apikey.txt` file, then a `GOOGLE_MAPS_API_KEY=` line in `.env`.

use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Environment variable (and `.env` entry) holding the key
pub const API_KEY_VAR: &str = "GOOGLE_MAPS_API_KEY";

/// File containing only the key
pub const API_KEY_FILE: &str = "geocoding-apikey.txt";

/// Dotenv file searched last
pub const DOTENV_FILE: &str = ".env";

/// Error returned when no source provides a key
#[derive(Debug, Error)]
pub enum ApiKeyError {
    #[error(
        "Google Maps API key not found. Set GOOGLE_MAPS_API_KEY, create \
         geocoding-apikey.txt, or add GOOGLE_MAPS_API_KEY=<key> to .env"
    )]
    NotFound,
}

/// Where a key was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeySource {
    Environment,
    KeyFile,
    DotEnv,
}

impl fmt::Display for ApiKeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiKeySource::Environment => write!(f, "environment variable {}", API_KEY_VAR),
            ApiKeySource::KeyFile => write!(f, "{}", API_KEY_FILE),
            ApiKeySource::DotEnv => write!(f, "{} file", DOTENV_FILE),
        }
    }
}

/// A resolved API key and its origin
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub key: String,
    pub source: ApiKeySource,
}

// Keeps the key itself out of logs
impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("key", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Resolves the API key
///
/// # Arguments
/// * `env_value` - Value of `GOOGLE_MAPS_API_KEY`, if set
/// * `dir` - Directory searched for the key file and `.env`
///
/// # Returns
/// * `Ok(ApiKey)` from the first source holding a non-empty key
/// * `Err(ApiKeyError::NotFound)` if none does
pub fn resolve_api_key(env_value: Option<String>, dir: &Path) -> Result<ApiKey, ApiKeyError> {
    if let Some(key) = env_value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        return Ok(ApiKey {
            key,
            source: ApiKeySource::Environment,
        });
    }

    if let Ok(content) = fs::read_to_string(dir.join(API_KEY_FILE)) {
        let key = content.trim();
        if !key.is_empty() {
            return Ok(ApiKey {
                key: key.to_string(),
                source: ApiKeySource::KeyFile,
            });
        }
    }

    if let Ok(content) = fs::read_to_string(dir.join(DOTENV_FILE)) {
        if let Some(key) = dotenv_value(&content, API_KEY_VAR) {
            return Ok(ApiKey {
                key,
                source: ApiKeySource::DotEnv,
            });
        }
    }

    Err(ApiKeyError::NotFound)
}

/// Finds `name=value` in dotenv content, skipping empty values
fn dotenv_value(content: &str, name: &str) -> Option<String> {
    content
        .lines()
        .filter_map(|line| line.strip_prefix(name)?.strip_prefix('='))
        .map(|value| value.trim().trim_matches(|c: char| c == '"' || c == '\'').to_string())
        .find(|value| !value.is_empty())
}
