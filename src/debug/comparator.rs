//! Grid comparison against a reference
//!
//! Two protocols:
//! - full comparison over every element of two canonical grids
//! - restricted comparison over the cells named by a coordinate prefix, for
//!   truncated runs where only part of the grid was scattered
//!
//! Values are compared as f16 widened to f64, which is exact.

use half::f16;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VerifyError};
use crate::grid::{CellIndex, CoordinateTable, Grid, GridDims};

/// Maximum number of mismatching elements/cells kept in a verdict
pub const MAX_REPORTED_MISMATCHES: usize = 10;

/// Maximum number of failing channels listed per mismatching cell
pub const MAX_REPORTED_CHANNELS: usize = 5;

/// Combined tolerance: `|a - b| <= atol + rtol * |b|`, with `b` the reference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Relative tolerance
    pub rtol: f64,
    /// Absolute tolerance
    pub atol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            rtol: 1e-5,
            atol: 1e-5,
        }
    }
}

impl Tolerance {
    /// Create a tolerance pair
    pub fn new(rtol: f64, atol: f64) -> Self {
        Self { rtol, atol }
    }

    /// Bit-identical pairs always pass. Otherwise NaN and infinities never
    /// do, and finite pairs use the combined rule.
    pub fn allows(&self, actual: f16, expected: f16) -> bool {
        if actual.to_bits() == expected.to_bits() {
            return true;
        }
        if !actual.is_finite() || !expected.is_finite() {
            return false;
        }
        let b = f64::from(expected);
        (f64::from(actual) - b).abs() <= self.atol + self.rtol * b.abs()
    }
}

/// `|actual - expected|`, zero for bit-identical pairs (shared NaN or inf
/// included) and NaN when exactly one side is NaN.
pub fn abs_diff(actual: f16, expected: f16) -> f64 {
    if actual.to_bits() == expected.to_bits() {
        return 0.0;
    }
    (f64::from(actual) - f64::from(expected)).abs()
}

// NaN is sticky so an unmatched NaN shows up as the worst difference
fn max_diff(acc: f64, diff: f64) -> f64 {
    if acc.is_nan() || diff.is_nan() {
        f64::NAN
    } else {
        acc.max(diff)
    }
}

/// One element outside tolerance
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementMismatch {
    pub position: CellIndex,
    pub actual: f32,
    pub expected: f32,
    pub abs_diff: f64,
}

/// Numeric part of a full comparison; absent when shapes differ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    /// Largest element difference; NaN if some unmatched pair involves NaN
    pub max_abs_diff: f64,
    /// Mean element difference
    pub mean_abs_diff: f64,
    /// Every pair bit-identical
    pub exact: bool,
    /// Every pair within tolerance
    pub tolerant: bool,
    /// Elements compared
    pub total_elements: usize,
    /// Elements outside tolerance (only counted when neither flag holds)
    pub mismatch_count: usize,
    /// First mismatches in row-major (y, x, c) order
    pub mismatches: Vec<ElementMismatch>,
}

/// Result of [`compare_full`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullVerdict {
    /// Both grids have the same logical shape
    pub shape_match: bool,
    /// Shape of the output grid
    pub actual_dims: GridDims,
    /// Shape of the reference grid
    pub expected_dims: GridDims,
    /// Tolerance the comparison used
    pub tolerance: Tolerance,
    /// Value comparison, only run when shapes match
    pub numeric: Option<NumericSummary>,
}

impl FullVerdict {
    /// Shapes agree and values are exact or within tolerance
    pub fn passed(&self) -> bool {
        self.numeric
            .as_ref()
            .is_some_and(|n| n.exact || n.tolerant)
    }

    /// Summary string
    pub fn summary(&self) -> String {
        match &self.numeric {
            None => format!(
                "[FAIL] full - shape mismatch: output {}, reference {}",
                self.actual_dims, self.expected_dims
            ),
            Some(n) if n.exact => format!(
                "[PASS] full - shape {}, bit-exact",
                self.actual_dims
            ),
            Some(n) if n.tolerant => format!(
                "[PASS] full - shape {}, max_diff={:.2e}, mean_diff={:.2e} (rtol={:e}, atol={:e})",
                self.actual_dims, n.max_abs_diff, n.mean_abs_diff, self.tolerance.rtol, self.tolerance.atol
            ),
            Some(n) => format!(
                "[FAIL] full - {} of {} elements outside tolerance, max_diff={:.2e}, mean_diff={:.2e}",
                n.mismatch_count, n.total_elements, n.max_abs_diff, n.mean_abs_diff
            ),
        }
    }
}

/// Compare every element of `actual` against `expected`
pub fn compare_full(actual: &Grid, expected: &Grid, tolerance: Tolerance) -> FullVerdict {
    let actual_dims = actual.dims();
    let expected_dims = expected.dims();

    if actual_dims != expected_dims {
        return FullVerdict {
            shape_match: false,
            actual_dims,
            expected_dims,
            tolerance,
            numeric: None,
        };
    }

    let mut max_abs_diff = 0.0f64;
    let mut sum_abs_diff = 0.0f64;
    let mut exact = true;
    let mut tolerant = true;

    for (&a, &b) in actual.data().iter().zip(expected.data()) {
        let diff = abs_diff(a, b);
        max_abs_diff = max_diff(max_abs_diff, diff);
        sum_abs_diff += diff;
        exact &= a.to_bits() == b.to_bits();
        tolerant &= tolerance.allows(a, b);
    }

    let total_elements = actual.data().len();
    let mean_abs_diff = sum_abs_diff / total_elements.max(1) as f64;

    let (mismatch_count, mismatches) = if exact || tolerant {
        (0, Vec::new())
    } else {
        collect_mismatches(actual, expected, tolerance)
    };

    FullVerdict {
        shape_match: true,
        actual_dims,
        expected_dims,
        tolerance,
        numeric: Some(NumericSummary {
            max_abs_diff,
            mean_abs_diff,
            exact,
            tolerant,
            total_elements,
            mismatch_count,
            mismatches,
        }),
    }
}

fn collect_mismatches(
    actual: &Grid,
    expected: &Grid,
    tolerance: Tolerance,
) -> (usize, Vec<ElementMismatch>) {
    let mut count = 0;
    let mut sample = Vec::with_capacity(MAX_REPORTED_MISMATCHES);

    for (i, (&a, &b)) in actual.data().iter().zip(expected.data()).enumerate() {
        if tolerance.allows(a, b) {
            continue;
        }
        count += 1;
        if sample.len() < MAX_REPORTED_MISMATCHES {
            sample.push(ElementMismatch {
                position: actual.position(i),
                actual: a.to_f32(),
                expected: b.to_f32(),
                abs_diff: abs_diff(a, b),
            });
        }
    }

    (count, sample)
}

/// One channel of a mismatching cell
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMismatch {
    pub channel: usize,
    pub actual: f32,
    pub expected: f32,
}

/// A coordinate-selected cell whose channel vector is outside tolerance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellMismatch {
    /// Index of the coordinate record in the stream
    pub record_index: usize,
    /// Column
    pub x: usize,
    /// Row
    pub y: usize,
    /// Total failing channels at this cell
    pub failing_channels: usize,
    /// The first few failing channels
    pub channels: Vec<ChannelMismatch>,
}

/// Pass/fail classification of a restricted comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictedOutcome {
    /// Every eligible cell matched and at least one was checked
    Pass,
    /// At least one eligible cell is outside tolerance
    Fail,
    /// No coordinate record in the window was eligible
    NoEligibleCells,
}

/// Result of [`compare_restricted`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictedVerdict {
    /// Requested truncation window
    pub window: usize,
    /// Records actually inside the window (window clamped to table length)
    pub considered: usize,
    /// Eligible records compared
    pub checked: usize,
    /// Eligible records whose whole channel vector is within tolerance
    pub matched: usize,
    /// Records in the window skipped as wrong batch or out of bounds
    pub skipped: usize,
    /// Tolerance the comparison used
    pub tolerance: Tolerance,
    /// First mismatching cells in record order
    pub failures: Vec<CellMismatch>,
}

impl RestrictedVerdict {
    /// Classify this verdict
    pub fn outcome(&self) -> RestrictedOutcome {
        if self.checked == 0 {
            RestrictedOutcome::NoEligibleCells
        } else if self.matched == self.checked {
            RestrictedOutcome::Pass
        } else {
            RestrictedOutcome::Fail
        }
    }

    /// Matched fraction in percent (0 when nothing was checked)
    pub fn match_rate(&self) -> f64 {
        if self.checked == 0 {
            return 0.0;
        }
        self.matched as f64 / self.checked as f64 * 100.0
    }

    /// Summary string
    pub fn summary(&self) -> String {
        match self.outcome() {
            RestrictedOutcome::Pass => format!(
                "[PASS] restricted - {}/{} cells matched (window {})",
                self.matched, self.checked, self.window
            ),
            RestrictedOutcome::Fail => format!(
                "[FAIL] restricted - {}/{} cells matched ({:.2}%, window {})",
                self.matched,
                self.checked,
                self.match_rate(),
                self.window
            ),
            RestrictedOutcome::NoEligibleCells => format!(
                "[FAIL] restricted - no eligible cells among {} records (window {}, {} skipped)",
                self.considered, self.window, self.skipped
            ),
        }
    }
}

/// Compare only the cells addressed by the first `window` coordinate records.
///
/// Records outside the active batch or outside the grid are skipped and do
/// not count as checked. Cells not addressed by an eligible record are never
/// inspected.
pub fn compare_restricted(
    actual: &Grid,
    expected: &Grid,
    coords: &CoordinateTable,
    window: usize,
    tolerance: Tolerance,
) -> Result<RestrictedVerdict> {
    let dims = actual.dims();
    if dims != expected.dims() {
        return Err(VerifyError::ShapeMismatch {
            actual: dims,
            expected: expected.dims(),
        });
    }

    let considered = coords.prefix(window).len();
    let mut checked = 0;
    let mut matched = 0;
    let mut failures = Vec::new();

    for (record_index, rec) in coords.eligible(window, dims) {
        checked += 1;
        let (x, y) = (rec.x as usize, rec.y as usize);
        let got = actual.cell(y, x);
        let want = expected.cell(y, x);

        let failing: Vec<usize> = got
            .iter()
            .zip(want)
            .enumerate()
            .filter(|(_, (a, b))| !tolerance.allows(**a, **b))
            .map(|(c, _)| c)
            .collect();

        if failing.is_empty() {
            matched += 1;
        } else if failures.len() < MAX_REPORTED_MISMATCHES {
            failures.push(CellMismatch {
                record_index,
                x,
                y,
                failing_channels: failing.len(),
                channels: failing
                    .iter()
                    .take(MAX_REPORTED_CHANNELS)
                    .map(|&c| ChannelMismatch {
                        channel: c,
                        actual: got[c].to_f32(),
                        expected: want[c].to_f32(),
                    })
                    .collect(),
            });
        }
    }

    Ok(RestrictedVerdict {
        window,
        considered,
        checked,
        matched,
        skipped: considered - checked,
        tolerance,
        failures,
    })
}
