//! Channel-last / channel-first normalization
//!
//! Every comparison works on the channel-last view. A channel-first buffer is
//! reshaped to `(1, C, H, W)` and permuted to `(1, H, W, C)`; values are only
//! moved, never converted.

use candle_core::{Device, Tensor};
use half::f16;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use super::{Grid, GridDims};
use crate::error::{Result, VerifyError};

/// Physical ordering of a batch-1 grid buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// `(1, H, W, C)`, channel varies fastest
    #[serde(alias = "nhwc")]
    ChannelLast,
    /// `(1, C, H, W)`, column varies fastest
    #[serde(alias = "nchw")]
    ChannelFirst,
}

impl Layout {
    /// 4-D shape of a buffer in this layout
    pub fn shape(&self, dims: GridDims) -> (usize, usize, usize, usize) {
        match self {
            Self::ChannelLast => (1, dims.height, dims.width, dims.channels),
            Self::ChannelFirst => (1, dims.channels, dims.height, dims.width),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelLast => f.write_str("channel_last"),
            Self::ChannelFirst => f.write_str("channel_first"),
        }
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "channel_last" | "nhwc" => Ok(Self::ChannelLast),
            "channel_first" | "nchw" => Ok(Self::ChannelFirst),
            other => Err(format!(
                "unknown layout '{}', expected channel_last (nhwc) or channel_first (nchw)",
                other
            )),
        }
    }
}

/// Note attached when a buffer was longer than its declared shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truncation {
    /// Elements kept
    pub expected: usize,
    /// Elements supplied
    pub actual: usize,
}

/// Result of normalizing one buffer
#[derive(Debug, Clone)]
pub struct Normalized {
    /// Canonical channel-last grid
    pub grid: Grid,
    /// Set when trailing elements were dropped
    pub truncated: Option<Truncation>,
}

/// Normalize a flat buffer in `layout` into a canonical channel-last grid.
///
/// Buffers longer than `dims` are cut to the expected prefix and flagged;
/// shorter buffers fail with [`VerifyError::InsufficientData`].
pub fn to_canonical(flat: &[f16], layout: Layout, dims: GridDims) -> Result<Normalized> {
    let expected = dims.checked_byte_len()? / std::mem::size_of::<u16>();
    if flat.len() < expected {
        return Err(VerifyError::InsufficientData {
            expected,
            actual: flat.len(),
        });
    }

    let truncated = (flat.len() > expected).then(|| {
        warn!(
            "Buffer holds {} elements, keeping the first {} for shape {}",
            flat.len(),
            expected,
            dims
        );
        Truncation {
            expected,
            actual: flat.len(),
        }
    });

    let prefix = flat[..expected].to_vec();
    let data = match layout {
        Layout::ChannelLast => prefix,
        Layout::ChannelFirst => {
            debug!("Permuting channel_first buffer {:?} to channel_last", layout.shape(dims));
            permute(prefix, layout.shape(dims), (0, 2, 3, 1))?
        }
    };

    Ok(Normalized {
        grid: Grid::from_channel_last(dims, data)?,
        truncated,
    })
}

/// Re-emit a canonical grid as a flat buffer in `layout` (inverse of [`to_canonical`])
pub fn from_canonical(grid: &Grid, layout: Layout) -> Result<Vec<f16>> {
    match layout {
        Layout::ChannelLast => Ok(grid.data().to_vec()),
        Layout::ChannelFirst => permute(
            grid.data().to_vec(),
            Layout::ChannelLast.shape(grid.dims()),
            (0, 3, 1, 2),
        ),
    }
}

fn permute(
    data: Vec<f16>,
    shape: (usize, usize, usize, usize),
    axes: (usize, usize, usize, usize),
) -> Result<Vec<f16>> {
    if data.is_empty() {
        return Ok(data);
    }
    let tensor = Tensor::from_vec(data, shape, &Device::Cpu)?;
    let permuted = tensor.permute(axes)?.contiguous()?;
    Ok(permuted.flatten_all()?.to_vec1::<f16>()?)
}
