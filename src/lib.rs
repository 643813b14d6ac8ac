//! treegeo library
//!
//! Exposes the geocode cache, the geocoding driver and the CLI definitions
//! for use by the binary and integration tests.

pub mod cache;
pub mod cli;
pub mod geocode;
