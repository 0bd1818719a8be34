//! Object and array persistence
//!
//! Objects are written as a bincode envelope carrying magic bytes, a format
//! version, the stored type and an FNV-1a checksum of the payload. A path
//! ending in `.json` stores plain JSON instead.

use crate::error::{NetworkSecurityError, Result};
use ndarray::Array2;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

const MAGIC: [u8; 4] = *b"NSEC";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoredObject {
    magic: [u8; 4],
    format_version: u32,
    type_name: String,
    created_at: String,
    payload: Vec<u8>,
    checksum: u64,
}

/// FNV-1a hash of the payload
fn checksum(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("json"))
}

/// Encode `obj` in the stored-object envelope
pub fn to_bytes<T: Serialize>(obj: &T) -> Result<Vec<u8>> {
    let payload = bincode::serialize(obj)?;
    Ok(bincode::serialize(&StoredObject {
        magic: MAGIC,
        format_version: FORMAT_VERSION,
        type_name: std::any::type_name::<T>().to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
        checksum: checksum(&payload),
        payload,
    })?)
}

/// Serialize `obj` to `path`, creating parent directories
pub fn save_object<T: Serialize>(path: impl AsRef<Path>, obj: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let bytes = if is_json(path) {
        serde_json::to_vec_pretty(obj)?
    } else {
        to_bytes(obj)?
    };

    fs::write(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "object saved");
    Ok(())
}

/// Read an object written by [`save_object`]
pub fn load_object<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;

    if is_json(path) {
        return Ok(serde_json::from_slice(&bytes)?);
    }

    if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
        return Err(NetworkSecurityError::SerializationError(format!(
            "{} is not a stored object",
            path.display()
        )));
    }

    let stored: StoredObject = bincode::deserialize(&bytes)?;
    if stored.format_version != FORMAT_VERSION {
        return Err(NetworkSecurityError::SerializationError(format!(
            "unsupported format version {} in {}",
            stored.format_version,
            path.display()
        )));
    }
    if checksum(&stored.payload) != stored.checksum {
        return Err(NetworkSecurityError::SerializationError(format!(
            "checksum mismatch in {}",
            path.display()
        )));
    }
    let expected = std::any::type_name::<T>();
    if stored.type_name != expected {
        return Err(NetworkSecurityError::SerializationError(format!(
            "{} holds {}, expected {}",
            path.display(),
            stored.type_name,
            expected
        )));
    }

    debug!(path = %path.display(), created_at = %stored.created_at, "object loaded");
    Ok(bincode::deserialize(&stored.payload)?)
}

/// Persist a numeric matrix
pub fn save_array(path: impl AsRef<Path>, array: &Array2<f64>) -> Result<()> {
    save_object(path, array)
}

/// Load a numeric matrix written by [`save_array`]
pub fn load_array(path: impl AsRef<Path>) -> Result<Array2<f64>> {
    load_object(path)
}
