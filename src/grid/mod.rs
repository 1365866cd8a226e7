//! Dense spatial grids and their inputs
//!
//! - Canonical channel-last grid type
//! - Channel-last / channel-first layout normalization
//! - Coordinate table parsing
//! - Raw little-endian buffer loading

mod coords;
mod layout;
mod loader;

pub use coords::{CoordinateRecord, CoordinateTable, ACTIVE_BATCH, RECORD_BYTES};
pub use layout::{from_canonical, to_canonical, Layout, Normalized, Truncation};
pub use loader::{decode_f16_le, file_size, load_f16_file};

use half::f16;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, VerifyError};

/// Logical grid dimensions (batch is always 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDims {
    /// Rows (y)
    pub height: usize,
    /// Columns (x)
    pub width: usize,
    /// Features per cell
    pub channels: usize,
}

impl GridDims {
    /// Create grid dimensions
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Number of f16 elements in a batch-1 grid
    pub fn element_count(&self) -> usize {
        self.height * self.width * self.channels
    }

    /// Byte length of a batch-1 grid buffer
    pub fn byte_len(&self) -> usize {
        self.element_count() * std::mem::size_of::<u16>()
    }

    /// Byte length, or a config error when the dimensions overflow `usize`.
    ///
    /// [`element_count`](Self::element_count) and [`byte_len`](Self::byte_len)
    /// assume dims that passed this check.
    pub fn checked_byte_len(&self) -> Result<usize> {
        self.height
            .checked_mul(self.width)
            .and_then(|n| n.checked_mul(self.channels))
            .and_then(|n| n.checked_mul(std::mem::size_of::<u16>()))
            .ok_or_else(|| VerifyError::Config(format!("grid dimensions {} overflow", self)))
    }

    /// Canonical 4-D shape `[1, H, W, C]`
    pub fn nhwc(&self) -> [usize; 4] {
        [1, self.height, self.width, self.channels]
    }

    /// Whether `(x, y)` addresses a cell of this grid
    pub fn contains(&self, x: u32, y: u32) -> bool {
        (x as usize) < self.width && (y as usize) < self.height
    }
}

impl Default for GridDims {
    /// Reference deployment: 720 x 720 cells, 64 channels
    fn default() -> Self {
        Self::new(720, 720, 64)
    }
}

impl fmt::Display for GridDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.nhwc())
    }
}

/// Position of one element of a canonical grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellIndex {
    /// Row
    pub y: usize,
    /// Column
    pub x: usize,
    /// Channel
    pub c: usize,
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(0, {}, {}, {})", self.y, self.x, self.c)
    }
}

/// A batch-1 dense grid stored channel-last: `(1, height, width, channels)`
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    dims: GridDims,
    data: Vec<f16>,
}

impl Grid {
    /// Wrap an already channel-last buffer of exactly `dims.element_count()` values
    pub fn from_channel_last(dims: GridDims, data: Vec<f16>) -> Result<Self> {
        let expected = dims.element_count();
        if data.len() < expected {
            return Err(VerifyError::InsufficientData {
                expected,
                actual: data.len(),
            });
        }
        if data.len() > expected {
            return Err(VerifyError::Parse {
                what: "grid buffer",
                reason: format!("{} elements for shape {}", data.len(), dims),
            });
        }
        Ok(Self { dims, data })
    }

    /// All-zero grid
    pub fn zeros(dims: GridDims) -> Self {
        Self {
            dims,
            data: vec![f16::ZERO; dims.element_count()],
        }
    }

    /// Grid dimensions
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Canonical element buffer in row-major (H, W, C) order
    pub fn data(&self) -> &[f16] {
        &self.data
    }

    /// Consume into the canonical buffer
    pub fn into_data(self) -> Vec<f16> {
        self.data
    }

    fn offset(&self, y: usize, x: usize) -> usize {
        (y * self.dims.width + x) * self.dims.channels
    }

    /// Value at `(y, x, c)`
    pub fn get(&self, y: usize, x: usize, c: usize) -> f16 {
        self.data[self.offset(y, x) + c]
    }

    /// Overwrite the value at `(y, x, c)`
    pub fn set(&mut self, y: usize, x: usize, c: usize, value: f16) {
        let idx = self.offset(y, x) + c;
        self.data[idx] = value;
    }

    /// Channel vector of the cell at row `y`, column `x`
    pub fn cell(&self, y: usize, x: usize) -> &[f16] {
        let start = self.offset(y, x);
        &self.data[start..start + self.dims.channels]
    }

    /// Logical position of a flat canonical index
    pub fn position(&self, flat: usize) -> CellIndex {
        let c = flat % self.dims.channels;
        let cell = flat / self.dims.channels;
        CellIndex {
            y: cell / self.dims.width,
            x: cell % self.dims.width,
            c,
        }
    }
}
