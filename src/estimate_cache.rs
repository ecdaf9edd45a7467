//! Cached estimator results with SHA-256 integrity checksums.
//!
//! Re-submitting the same photos (the form re-renders the quote whenever the
//! user steps back and forward) should not burn another model call, so
//! estimate responses are cached keyed by the request content. Entries carry
//! a checksum; anything corrupted or tampered is discarded and refetched.

use crate::models::Photo;
use sha2::{Digest, Sha256};

/// Cache key derived from everything that influences the estimate.
pub fn estimate_cache_key(photos: &[Photo], junk_types: &[String], property_type: &str) -> String {
    let mut hasher = Sha256::new();
    for photo in photos {
        hasher.update(photo.url.as_bytes());
        hasher.update([0u8]);
    }
    for junk_type in junk_types {
        hasher.update(junk_type.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(property_type.as_bytes());
    hex::encode(hasher.finalize())
}

/// Wrapper for cached data with integrity validation
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ValidatedCacheEntry {
    /// The actual cached data (JSON string)
    pub data: String,
    /// SHA-256 checksum of the data (hex encoded)
    pub checksum: String,
}

impl ValidatedCacheEntry {
    /// Creates a new validated cache entry with computed checksum
    pub fn new(data: String) -> Self {
        let checksum = Self::compute_checksum(&data);
        Self { data, checksum }
    }

    /// Computes SHA-256 checksum of the data
    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Validates the integrity of the cached data
    ///
    /// Returns true if the checksum matches, false if tampered
    pub fn is_valid(&self) -> bool {
        let computed = Self::compute_checksum(&self.data);
        computed == self.checksum
    }

    /// Serializes the entry for storage in cache
    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Deserializes and validates a cache entry
    ///
    /// Returns Some(data) if valid, None if corrupted or invalid JSON
    pub fn deserialize_and_validate(serialized: &str) -> Option<String> {
        let entry: ValidatedCacheEntry = serde_json::from_str(serialized).ok()?;

        if entry.is_valid() {
            Some(entry.data)
        } else {
            // Checksum mismatch - cache poisoned
            tracing::warn!(
                "Cache validation failed: checksum mismatch. Expected: {}, Data length: {}",
                entry.checksum,
                entry.data.len()
            );
            None
        }
    }
}
