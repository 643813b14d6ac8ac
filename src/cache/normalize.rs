//! Address normalization and cache key derivation
//!
//! Superficially different spellings of the same address ("123 Main Street, TX"
//! and "123 main st., texas") normalize to one string and therefore one key.

use sha2::{Digest, Sha256};

/// Number of hex characters kept from the SHA-256 digest
pub const CACHE_KEY_LEN: usize = 16;

/// Word-level substitutions, applied in order as plain substring replacements
///
/// Matching is not anchored at word ends, so " streetview" becomes " stview".
const ABBREVIATIONS: [(&str, &str); 12] = [
    (" street", " st"),
    (" drive", " dr"),
    (" road", " rd"),
    (" avenue", " ave"),
    (" lane", " ln"),
    (" court", " ct"),
    (" circle", " cir"),
    (" boulevard", " blvd"),
    (" place", " pl"),
    (" trail", " trl"),
    (" way", " wy"),
    (" texas", " tx"),
];

/// Normalizes a free-text address for consistent cache lookups
///
/// Lowercases, contracts street-suffix and state names, collapses whitespace,
/// and strips periods and commas.
pub fn normalize_address(address: &str) -> String {
    let mut normalized = address.to_lowercase();

    for (long, short) in ABBREVIATIONS {
        if normalized.contains(long) {
            normalized = normalized.replace(long, short);
        }
    }

    let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.replace(['.', ','], "")
}

/// Derives the cache key for an address
///
/// # Returns
/// The first 16 lowercase hex characters of SHA-256 over the normalized address
pub fn cache_key(address: &str) -> String {
    key_for_normalized(&normalize_address(address))
}

/// Derives the cache key for an already-normalized address
pub(crate) fn key_for_normalized(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..CACHE_KEY_LEN].to_string()
}
