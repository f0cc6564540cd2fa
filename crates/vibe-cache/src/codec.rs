//! Gzip-compressed JSON payloads.
//!
//! Frame lists carry base64 image data URLs and compress well; analysis
//! results are small but use the same encoding for uniformity.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{CacheError, CacheResult};

/// Serialize `value` to JSON and gzip it.
pub fn encode_json<T: Serialize>(value: &T) -> CacheResult<Vec<u8>> {
    let json = serde_json::to_vec(value)
        .map_err(|e| CacheError::serialization(format!("Failed to serialize payload: {}", e)))?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| CacheError::serialization(format!("Failed to gzip payload: {}", e)))?;

    encoder
        .finish()
        .map_err(|e| CacheError::serialization(format!("Failed to finish gzip encoding: {}", e)))
}

/// Decode a gzip JSON payload.
///
/// Returns `None` if decompression or deserialization fails (treated as cache miss).
pub fn decode_json<T: DeserializeOwned>(data: &[u8]) -> Option<T> {
    let mut decoder = GzDecoder::new(data);
    let mut json = Vec::new();

    if let Err(e) = decoder.read_to_end(&mut json) {
        warn!(error = %e, "Failed to decompress cached payload");
        return None;
    }

    match serde_json::from_slice(&json) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "Failed to deserialize cached payload");
            None
        }
    }
}
