//! Command-line interface parsing for treegeo
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! the configuration the commands run with.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::cache::default_cache_path;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// A latitude or longitude was outside its valid range
    #[error("Invalid {axis}: {value} (must be between -{limit} and {limit})")]
    OutOfRange {
        axis: &'static str,
        value: f64,
        limit: f64,
    },

    /// Reading the address list failed
    #[error("Could not read addresses from {source_name}: {error}")]
    ReadAddresses {
        source_name: String,
        error: std::io::Error,
    },
}

/// treegeo - Geocode tree pickup addresses with a persistent cache
#[derive(Parser, Debug)]
#[command(name = "treegeo")]
#[command(about = "Cache-first geocoding for tree pickup routes")]
#[command(version)]
pub struct Cli {
    /// Path of the geocode cache file
    #[arg(long, global = true, env = "TREEGEO_CACHE", value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Geocode addresses, calling the API only for addresses not yet cached
    ///
    /// Addresses come from the arguments, from --file, or one per line on stdin.
    Geocode {
        /// Addresses to geocode
        addresses: Vec<String>,

        /// Read addresses from a file, one per line
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// Geocode at most this many addresses (0 means all)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Append this state to each address (e.g. TX)
        #[arg(long, value_name = "STATE")]
        state: Option<String>,

        /// Use only the cache; never call the API
        #[arg(long)]
        offline: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show cached coordinates for an address without calling the API
    Lookup {
        address: String,
    },

    /// Store coordinates for an address by hand
    Set {
        address: String,
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },

    /// Print the normalized form and cache key of an address
    Normalize {
        address: String,
    },

    /// Show cache size and metadata
    Stats,
}

/// Settings shared by all commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Location of the cache file
    pub cache_path: PathBuf,
    /// Whether debug logging is enabled
    pub verbose: bool,
}

impl RunConfig {
    /// Creates a RunConfig from parsed CLI arguments.
    ///
    /// Falls back to the default cache location when `--cache` is not given.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            cache_path: cli.cache.clone().unwrap_or_else(default_cache_path),
            verbose: cli.verbose,
        }
    }

    /// Log filter used when `RUST_LOG` is not set
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "treegeo=debug"
        } else {
            "treegeo=info"
        }
    }
}

/// Checks that a coordinate pair is on the globe
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), CliError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(CliError::OutOfRange {
            axis: "latitude",
            value: latitude,
            limit: 90.0,
        });
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(CliError::OutOfRange {
            axis: "longitude",
            value: longitude,
            limit: 180.0,
        });
    }
    Ok(())
}

/// Splits text into addresses, one per non-blank line
pub fn parse_address_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
