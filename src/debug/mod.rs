//! Debug and validation utilities
//!
//! Tools for checking operator output against reference data:
//! - Full and coordinate-restricted grid comparison with tolerance
//! - Grid statistics and scatter coverage

mod comparator;
mod stats;

pub use comparator::{
    compare_full, compare_restricted, CellMismatch, ChannelMismatch, ElementMismatch,
    FullVerdict, NumericSummary, RestrictedOutcome, RestrictedVerdict, Tolerance,
    MAX_REPORTED_CHANNELS, MAX_REPORTED_MISMATCHES,
};
pub use stats::{coverage, Coverage, CoverageSample, GridStats, COVERAGE_SAMPLES};
