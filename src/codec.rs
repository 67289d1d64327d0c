//! Artifact file encoding
//!
//! Artifacts are stored as JSON, gzip-compressed when the file name ends
//! in `.gz`. Encoding is deterministic: the gzip header carries no
//! timestamp, so equal values produce equal bytes and equal fingerprints.

use crate::error::{CacheError, CacheResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;
use std::io::{Read, Write};

/// Whether a file name denotes gzip content
pub fn is_gzip(file_name: &str) -> bool {
    file_name.ends_with(".gz")
}

/// Decode an artifact file into its value
pub fn decode(file_name: &str, bytes: &[u8]) -> CacheResult<Value> {
    let text = read_text(file_name, bytes)?;
    serde_json::from_slice(&text).map_err(|e| CacheError::Decode {
        file: file_name.to_string(),
        reason: e.to_string(),
    })
}

/// Encode a value into artifact file bytes
pub fn encode(file_name: &str, value: &Value) -> CacheResult<Vec<u8>> {
    let json = serde_json::to_vec(value)?;
    if !is_gzip(file_name) {
        return Ok(json);
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .and_then(|_| encoder.finish())
        .map_err(|e| CacheError::io(format!("compressing {}", file_name), e))
}

/// Return the uncompressed bytes of a raw or gzip file
pub fn read_text(file_name: &str, bytes: &[u8]) -> CacheResult<Vec<u8>> {
    if !is_gzip(file_name) {
        return Ok(bytes.to_vec());
    }
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| CacheError::Decode {
            file: file_name.to_string(),
            reason: e.to_string(),
        })?;
    Ok(out)
}
