//! Pillar coordinate table
//!
//! Each record is four little-endian u32 values: `(batch_id, x, y, reserved)`.
//! Record order is the order the operator consumed pillars in, so the index of
//! a record decides whether it falls inside a truncation window.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use super::loader::read_bytes;
use super::GridDims;
use crate::error::{Result, VerifyError};

/// Bytes per coordinate record
pub const RECORD_BYTES: usize = 4 * std::mem::size_of::<u32>();

/// Batch index that restricted comparison inspects
pub const ACTIVE_BATCH: u32 = 0;

/// One pillar's grid placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateRecord {
    /// Batch the pillar belongs to; only [`ACTIVE_BATCH`] is compared
    pub batch_id: u32,
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
    /// Unused by the scatter
    pub reserved: u32,
}

impl CoordinateRecord {
    /// Create a record
    pub fn new(batch_id: u32, x: u32, y: u32, reserved: u32) -> Self {
        Self {
            batch_id,
            x,
            y,
            reserved,
        }
    }

    /// Active batch and inside `dims`
    pub fn is_eligible(&self, dims: GridDims) -> bool {
        self.batch_id == ACTIVE_BATCH && dims.contains(self.x, self.y)
    }
}

/// Ordered, read-only sequence of coordinate records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinateTable {
    records: Vec<CoordinateRecord>,
}

impl CoordinateTable {
    /// Build a table from records already in stream order
    pub fn new(records: Vec<CoordinateRecord>) -> Self {
        Self { records }
    }

    /// Parse a little-endian record stream
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % RECORD_BYTES != 0 {
            return Err(VerifyError::Parse {
                what: "coordinate stream",
                reason: format!(
                    "{} bytes is not a multiple of the {}-byte record size",
                    bytes.len(),
                    RECORD_BYTES
                ),
            });
        }

        let records = bytes
            .chunks_exact(RECORD_BYTES)
            .map(|rec| {
                let word = |i: usize| {
                    u32::from_le_bytes([rec[4 * i], rec[4 * i + 1], rec[4 * i + 2], rec[4 * i + 3]])
                };
                CoordinateRecord::new(word(0), word(1), word(2), word(3))
            })
            .collect();

        Ok(Self { records })
    }

    /// Load a coordinate file.
    ///
    /// A missing file yields [`VerifyError::NotFound`], malformed content
    /// [`VerifyError::Parse`], so callers can fall back to full comparison
    /// only in the first case.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = read_bytes(path)?;
        let table = Self::from_bytes(&bytes)?;
        debug!("Loaded {} coordinate records from {:?}", table.len(), path);
        Ok(table)
    }

    /// Serialize back to the on-disk record stream
    pub fn to_bytes(&self) -> Vec<u8> {
        self.records
            .iter()
            .flat_map(|r| [r.batch_id, r.x, r.y, r.reserved])
            .flat_map(u32::to_le_bytes)
            .collect()
    }

    /// Records in stream order
    pub fn records(&self) -> &[CoordinateRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The first `window` records (all of them if the table is shorter)
    pub fn prefix(&self, window: usize) -> &[CoordinateRecord] {
        &self.records[..window.min(self.records.len())]
    }

    /// Eligible records of the first `window`, paired with their stream index
    pub fn eligible(
        &self,
        window: usize,
        dims: GridDims,
    ) -> impl Iterator<Item = (usize, &CoordinateRecord)> + '_ {
        self.prefix(window)
            .iter()
            .enumerate()
            .filter(move |(_, rec)| rec.is_eligible(dims))
    }
}

impl FromIterator<CoordinateRecord> for CoordinateTable {
    fn from_iter<I: IntoIterator<Item = CoordinateRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
