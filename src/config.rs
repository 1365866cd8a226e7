//! Verification run configuration
//!
//! Everything a run depends on (paths, layouts, dimensions, tolerance and the
//! truncation window) is passed in through [`VerifyConfig`]. It can be read
//! from YAML and overridden field by field from the command line.
//!
//! ```yaml
//! dims: { height: 720, width: 720, channels: 64 }
//! tolerance: { rtol: 1.0e-5, atol: 1.0e-5 }
//! output: { path: ./output/OpTest_scatter_output_x.bin, layout: channel_last }
//! reference: { path: ./output/OpTest_scatter_output_x_correct.bin, layout: channel_first }
//! coords: ./input/OpTest_scatter_input_coords.bin
//! window: 9282
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::debug::Tolerance;
use crate::error::{Result, VerifyError};
use crate::grid::{GridDims, Layout};

/// Default operator output dump
pub const DEFAULT_OUTPUT_PATH: &str = "./output/OpTest_scatter_output_x.bin";
/// Default reference dump
pub const DEFAULT_REFERENCE_PATH: &str = "./output/OpTest_scatter_output_x_correct.bin";
/// Default coordinate stream
pub const DEFAULT_COORDS_PATH: &str = "./input/OpTest_scatter_input_coords.bin";

/// One grid input and how its bytes are laid out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSource {
    /// Raw little-endian f16 file
    pub path: PathBuf,
    /// Memory layout of the file
    pub layout: Layout,
    /// Per-grid dimensions; falls back to [`VerifyConfig::dims`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dims: Option<GridDims>,
}

impl GridSource {
    /// Source with the run-wide dimensions
    pub fn new(path: impl Into<PathBuf>, layout: Layout) -> Self {
        Self {
            path: path.into(),
            layout,
            dims: None,
        }
    }
}

/// Configuration of a single verification run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Operator output under test
    pub output: GridSource,
    /// Reference output
    pub reference: GridSource,
    /// Grid dimensions shared by both inputs unless overridden
    pub dims: GridDims,
    /// Combined rtol/atol applied by both comparisons
    pub tolerance: Tolerance,
    /// Coordinate stream; restricted comparison needs this and `window`
    pub coords: Option<PathBuf>,
    /// Number of leading coordinate records the operator run consumed
    pub window: Option<usize>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            output: GridSource::new(DEFAULT_OUTPUT_PATH, Layout::ChannelLast),
            reference: GridSource::new(DEFAULT_REFERENCE_PATH, Layout::ChannelFirst),
            dims: GridDims::default(),
            tolerance: Tolerance::default(),
            coords: Some(PathBuf::from(DEFAULT_COORDS_PATH)),
            window: None,
        }
    }
}

impl VerifyConfig {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| VerifyError::from_io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| VerifyError::Config(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        let Tolerance { rtol, atol } = self.tolerance;
        for (name, value) in [("rtol", rtol), ("atol", atol)] {
            if !value.is_finite() || value < 0.0 {
                return Err(VerifyError::Config(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }

        for (name, dims) in [
            ("dims", Some(self.dims)),
            ("output.dims", self.output.dims),
            ("reference.dims", self.reference.dims),
        ] {
            if let Some(d) = dims {
                if d.checked_byte_len()? == 0 {
                    return Err(VerifyError::Config(format!(
                        "{} must be non-zero in every axis, got {}",
                        name, d
                    )));
                }
            }
        }
        Ok(())
    }

    /// Dimensions declared for the output grid
    pub fn output_dims(&self) -> GridDims {
        self.output.dims.unwrap_or(self.dims)
    }

    /// Dimensions declared for the reference grid
    pub fn reference_dims(&self) -> GridDims {
        self.reference.dims.unwrap_or(self.dims)
    }

    /// Coordinate path and window, when restricted comparison is requested
    pub fn restricted_inputs(&self) -> Option<(&Path, usize)> {
        match (&self.coords, self.window) {
            (Some(path), Some(window)) => Some((path.as_path(), window)),
            _ => None,
        }
    }
}
