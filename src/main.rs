//! treegeo - Cache-first geocoding for tree pickup routes
//!
//! Geocodes pickup addresses through the Google Maps API, keeping every result
//! in a persistent cache so each address is paid for only once.

use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use treegeo::cache::{cache_key, normalize_address, CacheSession, GeocodeCache};
use treegeo::cli::{parse_address_lines, validate_coordinates, Cli, CliError, Command, RunConfig};
use treegeo::geocode::{
    full_address, geocode_batch, resolve_api_key, BatchReport, GoogleGeocoder,
};

/// Sets up logging to stderr, honouring `RUST_LOG` when present
fn init_tracing(config: &RunConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter())),
        )
        .with_writer(io::stderr)
        .init();
}

/// Collects the addresses for a geocode run
fn read_addresses(
    addresses: Vec<String>,
    file: Option<&Path>,
    state: Option<&str>,
) -> Result<Vec<String>, CliError> {
    let mut all = addresses;

    if let Some(path) = file {
        let text = std::fs::read_to_string(path).map_err(|error| CliError::ReadAddresses {
            source_name: path.display().to_string(),
            error,
        })?;
        all.extend(parse_address_lines(&text));
    } else if all.is_empty() {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .map_err(|error| CliError::ReadAddresses {
                source_name: "stdin".to_string(),
                error,
            })?;
        all.extend(parse_address_lines(&text));
    }

    Ok(match state {
        Some(state) => all.iter().map(|a| full_address(&[a.as_str()], state)).collect(),
        None => all,
    })
}

/// Prints a batch report to stdout
fn print_report(report: &BatchReport, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for outcome in &report.outcomes {
        match outcome.coordinates {
            Some(coords) => println!("{}\t{}", coords, outcome.address),
            None => println!("-\t{}", outcome.address),
        }
    }

    let total = report.outcomes.len();
    println!();
    println!("Geocoded:   {}/{}", report.successful(), total);
    println!("API calls:  {}", report.api_calls);
    println!("Cache hits: {}", report.cache_hits);

    let failed: Vec<_> = report.failed().collect();
    if !failed.is_empty() {
        println!("\nAddresses that failed to geocode:");
        for outcome in failed {
            println!("  {}", outcome.address);
        }
    }
    Ok(())
}

async fn run_geocode(
    config: &RunConfig,
    addresses: Vec<String>,
    file: Option<&Path>,
    limit: Option<usize>,
    state: Option<&str>,
    offline: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let addresses = read_addresses(addresses, file, state)?;
    if addresses.is_empty() {
        warn!("No addresses to geocode");
        return Ok(());
    }

    let geocoder = if offline {
        None
    } else {
        let current_dir = std::env::current_dir()?;
        match resolve_api_key(std::env::var("GOOGLE_MAPS_API_KEY").ok(), &current_dir) {
            Ok(api_key) => {
                info!(source = %api_key.source, "Using Google Maps API key");
                Some(GoogleGeocoder::new(api_key.key))
            }
            Err(e) => {
                warn!("{}; continuing with cached results only", e);
                None
            }
        }
    };

    // Saved when the session drops, including after Ctrl-C
    let mut session = CacheSession::open(&config.cache_path);
    info!(count = addresses.len(), "Geocoding addresses");

    tokio::select! {
        report = geocode_batch(&addresses, &mut session, geocoder.as_ref(), limit) => {
            print_report(&report, json)?;
        }
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("Interrupted; saving results gathered so far");
        }
    }

    let stats = session.close();
    println!("Cache stats: {}", stats);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = RunConfig::from_cli(&cli);
    init_tracing(&config);

    match cli.command {
        Command::Geocode {
            addresses,
            file,
            limit,
            state,
            offline,
            json,
        } => {
            run_geocode(
                &config,
                addresses,
                file.as_deref(),
                limit,
                state.as_deref(),
                offline,
                json,
            )
            .await?;
        }
        Command::Lookup { address } => {
            let mut cache = GeocodeCache::open(&config.cache_path);
            match cache.get(&address) {
                Some(coords) => println!("{}", coords),
                None => {
                    println!("not cached");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Set {
            address,
            latitude,
            longitude,
        } => {
            validate_coordinates(latitude, longitude)?;
            let mut session = CacheSession::open(&config.cache_path);
            session.set(&address, latitude, longitude);
            println!("{}\t{}", cache_key(&address), normalize_address(&address));
        }
        Command::Normalize { address } => {
            println!("{}\t{}", cache_key(&address), normalize_address(&address));
        }
        Command::Stats => {
            let cache = GeocodeCache::open(&config.cache_path);
            println!("Cache file:   {}", cache.path().display());
            println!("Version:      {}", cache.version());
            println!("Created:      {}", cache.created().format("%Y-%m-%d %H:%M:%S"));
            println!("Last updated: {}", cache.last_updated().format("%Y-%m-%d %H:%M:%S"));
            println!("Addresses:    {}", cache.len());
        }
    }

    Ok(ExitCode::SUCCESS)
}
