//! Raw buffer loading
//!
//! Grid dumps are headerless little-endian f16 streams, as written by the
//! operator host program.

use half::f16;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::error::{Result, VerifyError};

/// Read a whole file; the handle is dropped before returning on every path
pub(crate) fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|e| VerifyError::from_io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| VerifyError::from_io(path, e))?;
    Ok(bytes)
}

/// Size of a file in bytes
pub fn file_size<P: AsRef<Path>>(path: P) -> Result<u64> {
    let path = path.as_ref();
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| VerifyError::from_io(path, e))
}

/// Decode little-endian f16 values
pub fn decode_f16_le(bytes: &[u8]) -> Result<Vec<f16>> {
    if bytes.len() % 2 != 0 {
        return Err(VerifyError::Parse {
            what: "f16 grid buffer",
            reason: format!("{} bytes is not a whole number of 2-byte elements", bytes.len()),
        });
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|b| f16::from_bits(u16::from_le_bytes([b[0], b[1]])))
        .collect())
}

/// Load a raw f16 grid dump
pub fn load_f16_file<P: AsRef<Path>>(path: P) -> Result<Vec<f16>> {
    let path = path.as_ref();
    let bytes = read_bytes(path)?;
    let values = decode_f16_le(&bytes)?;
    debug!("Loaded {} f16 values from {:?}", values.len(), path);
    Ok(values)
}
