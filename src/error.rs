//! Error types for verification runs
//!
//! Structural problems (missing files, malformed streams, shape disagreements)
//! are errors. Numeric disagreement between two well-formed grids is not: it is
//! reported through the comparison verdicts.

use std::path::PathBuf;
use thiserror::Error;

use crate::grid::GridDims;

/// Errors produced while loading, normalizing or comparing grids
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum VerifyError {
    /// A required file is absent
    #[error("file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// Byte stream cannot be decoded into the expected record layout
    #[error("malformed {what}: {reason}")]
    Parse { what: &'static str, reason: String },

    /// Buffer holds fewer elements than the declared dimensions require
    #[error("insufficient data: expected {expected} elements, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// Two grids disagree on their logical shape
    #[error("shape mismatch: output {actual} vs reference {expected}")]
    ShapeMismatch { actual: GridDims, expected: GridDims },

    /// Two grid files differ in byte length
    #[error("size mismatch: output {output_bytes} bytes vs reference {reference_bytes} bytes")]
    SizeMismatch {
        output_bytes: u64,
        reference_bytes: u64,
    },

    /// Configuration values are unusable
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Underlying read failure other than a missing file
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tensor reshape/permute failure
    #[error("tensor layout error: {0}")]
    Tensor(#[from] candle_core::Error),
}

/// Coarse classification used for exit messages and fallback decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Resource absent; a lesser verification mode may still be possible
    MissingResource,
    /// Malformed byte stream
    Parse,
    /// Undersized buffer
    InsufficientData,
    /// Grid shapes or file sizes disagree
    ShapeMismatch,
    /// Bad configuration
    Config,
    /// I/O or tensor backend failure
    Internal,
}

impl VerifyError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::MissingResource,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::ShapeMismatch { .. } | Self::SizeMismatch { .. } => ErrorKind::ShapeMismatch,
            Self::Config(_) => ErrorKind::Config,
            Self::Io { .. } | Self::Tensor(_) => ErrorKind::Internal,
        }
    }

    /// Map an I/O error on `path`, keeping "not found" distinct
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, VerifyError>;
