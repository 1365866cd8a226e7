//! Verification driver
//!
//! Orchestrates a run:
//! 1. Check both grid files exist and agree in byte size
//! 2. Load and normalize both grids to the channel-last view
//! 3. Full comparison (always, for diagnostics)
//! 4. Restricted comparison when a coordinate stream and window are configured
//! 5. Fold everything into a [`VerificationOutcome`]

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{GridSource, VerifyConfig};
use crate::debug::{
    compare_full, compare_restricted, coverage, Coverage, FullVerdict, GridStats,
    RestrictedOutcome, RestrictedVerdict, Tolerance,
};
use crate::error::{ErrorKind, Result, VerifyError};
use crate::grid::{
    file_size, load_f16_file, to_canonical, CoordinateTable, Grid, GridDims, Normalized,
    Truncation,
};

/// Why the full comparison decided the outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// A coordinate path was given but no truncation window
    NoWindow,
    /// The coordinate file does not exist
    CoordinatesMissing {
        /// Configured coordinate path
        path: PathBuf,
    },
}

/// Final state of a verification run
#[allow(missing_docs)]
#[derive(Debug)]
pub enum VerificationOutcome {
    /// Inputs could not be compared at all
    StructurallyInvalid { error: VerifyError },
    /// Restricted mode was selected but no coordinate record was eligible
    Unverified {
        restricted: RestrictedVerdict,
        full: FullVerdict,
    },
    /// Restricted comparison decided pass/fail; full kept for diagnostics
    RestrictedVerified {
        restricted: RestrictedVerdict,
        full: FullVerdict,
    },
    /// Full comparison decided pass/fail
    FullyVerified {
        full: FullVerdict,
        fallback: Option<Fallback>,
    },
}

impl VerificationOutcome {
    /// Pass only for a passing restricted or full verdict
    pub fn passed(&self) -> bool {
        match self {
            Self::RestrictedVerified { restricted, .. } => {
                restricted.outcome() == RestrictedOutcome::Pass
            }
            Self::FullyVerified { full, .. } => full.passed(),
            Self::StructurallyInvalid { .. } | Self::Unverified { .. } => false,
        }
    }

    /// Process exit code: 0 on pass, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }

    /// Short state name
    pub fn state(&self) -> &'static str {
        match self {
            Self::StructurallyInvalid { .. } => "structurally_invalid",
            Self::Unverified { .. } => "unverified",
            Self::RestrictedVerified { .. } => "restricted_verified",
            Self::FullyVerified { .. } => "fully_verified",
        }
    }

    /// Full verdict, if the grids were comparable
    pub fn full(&self) -> Option<&FullVerdict> {
        match self {
            Self::StructurallyInvalid { .. } => None,
            Self::Unverified { full, .. }
            | Self::RestrictedVerified { full, .. }
            | Self::FullyVerified { full, .. } => Some(full),
        }
    }

    /// Restricted verdict, if restricted mode ran
    pub fn restricted(&self) -> Option<&RestrictedVerdict> {
        match self {
            Self::Unverified { restricted, .. } | Self::RestrictedVerified { restricted, .. } => {
                Some(restricted)
            }
            _ => None,
        }
    }
}

/// Side information gathered during a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    /// Set when the output buffer was longer than its dims
    pub output_truncated: Option<Truncation>,
    /// Set when the reference buffer was longer than its dims
    pub reference_truncated: Option<Truncation>,
    /// Statistics of the normalized output grid
    pub output_stats: Option<GridStats>,
    /// Statistics of the normalized reference grid
    pub reference_stats: Option<GridStats>,
    /// Coverage of the eligible prefix in the output grid (restricted mode)
    pub output_coverage: Option<Coverage>,
    /// Coverage of the eligible prefix in the reference grid (restricted mode)
    pub reference_coverage: Option<Coverage>,
    /// Records in the coordinate stream
    pub coordinate_records: Option<usize>,
}

/// Outcome plus diagnostics
#[derive(Debug)]
pub struct VerificationReport {
    /// Terminal state and verdicts
    pub outcome: VerificationOutcome,
    /// Side information, filled as far as the run got
    pub diagnostics: Diagnostics,
}

impl VerificationReport {
    /// Pass/fail of the authoritative comparison
    pub fn passed(&self) -> bool {
        self.outcome.passed()
    }
}

/// Runs one verification from a [`VerifyConfig`]
pub struct Verifier {
    config: VerifyConfig,
}

impl Verifier {
    /// Create a verifier
    pub fn new(config: VerifyConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// Run the verification. Structural failures become
    /// [`VerificationOutcome::StructurallyInvalid`]; nothing is returned as `Err`.
    pub fn run(&self) -> VerificationReport {
        let mut diagnostics = Diagnostics::default();
        let outcome = match self.try_run(&mut diagnostics) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!("Verification aborted: {}", error);
                VerificationOutcome::StructurallyInvalid { error }
            }
        };
        info!("Verification finished: {}", outcome.state());
        VerificationReport {
            outcome,
            diagnostics,
        }
    }

    fn try_run(&self, diagnostics: &mut Diagnostics) -> Result<VerificationOutcome> {
        self.config.validate()?;

        let output_bytes = file_size(&self.config.output.path)?;
        let reference_bytes = file_size(&self.config.reference.path)?;
        info!(
            "Output {:?}: {} bytes, reference {:?}: {} bytes",
            self.config.output.path, output_bytes, self.config.reference.path, reference_bytes
        );
        if output_bytes != reference_bytes {
            return Err(VerifyError::SizeMismatch {
                output_bytes,
                reference_bytes,
            });
        }

        let output = load_grid(&self.config.output, self.config.output_dims())?;
        let reference = load_grid(&self.config.reference, self.config.reference_dims())?;
        diagnostics.output_truncated = output.truncated;
        diagnostics.reference_truncated = reference.truncated;
        diagnostics.output_stats = Some(GridStats::compute(&output.grid));
        diagnostics.reference_stats = Some(GridStats::compute(&reference.grid));

        let mode = match self.config.restricted_inputs() {
            Some((path, window)) => match load_coordinates(path)? {
                Some(table) => {
                    if window > table.len() {
                        warn!(
                            "Window {} exceeds the {} coordinate records, using all of them",
                            window,
                            table.len()
                        );
                    }
                    diagnostics.coordinate_records = Some(table.len());
                    diagnostics.output_coverage = Some(coverage(&output.grid, &table, window));
                    diagnostics.reference_coverage =
                        Some(coverage(&reference.grid, &table, window));
                    Mode::Restricted(table, window)
                }
                None => Mode::Full(Some(Fallback::CoordinatesMissing {
                    path: path.to_path_buf(),
                })),
            },
            None if self.config.coords.is_some() => {
                warn!("No truncation window configured, using full comparison");
                Mode::Full(Some(Fallback::NoWindow))
            }
            None => {
                debug!("No coordinate stream configured, using full comparison");
                Mode::Full(None)
            }
        };

        let tolerance = self.config.tolerance;
        match mode {
            Mode::Restricted(table, window) => verify_grids(
                &output.grid,
                &reference.grid,
                Some((&table, window)),
                tolerance,
            ),
            Mode::Full(fallback) => {
                let outcome = verify_grids(&output.grid, &reference.grid, None, tolerance)?;
                Ok(match outcome {
                    VerificationOutcome::FullyVerified { full, .. } => {
                        VerificationOutcome::FullyVerified { full, fallback }
                    }
                    other => other,
                })
            }
        }
    }
}

enum Mode {
    Restricted(CoordinateTable, usize),
    Full(Option<Fallback>),
}

/// Compare two canonical grids.
///
/// With `coords` the restricted verdict is authoritative and the full verdict
/// is kept for diagnostics; without it the full verdict decides.
pub fn verify_grids(
    output: &Grid,
    reference: &Grid,
    coords: Option<(&CoordinateTable, usize)>,
    tolerance: Tolerance,
) -> Result<VerificationOutcome> {
    let full = compare_full(output, reference, tolerance);
    if !full.shape_match {
        return Err(VerifyError::ShapeMismatch {
            actual: full.actual_dims,
            expected: full.expected_dims,
        });
    }
    debug!("{}", full.summary());

    let Some((table, window)) = coords else {
        return Ok(VerificationOutcome::FullyVerified {
            full,
            fallback: None,
        });
    };

    let restricted = compare_restricted(output, reference, table, window, tolerance)?;
    debug!("{}", restricted.summary());
    Ok(match restricted.outcome() {
        RestrictedOutcome::NoEligibleCells => VerificationOutcome::Unverified { restricted, full },
        RestrictedOutcome::Pass | RestrictedOutcome::Fail => {
            VerificationOutcome::RestrictedVerified { restricted, full }
        }
    })
}

fn load_grid(source: &GridSource, dims: GridDims) -> Result<Normalized> {
    let flat = load_f16_file(&source.path)?;
    let normalized = to_canonical(&flat, source.layout, dims)?;
    info!(
        "Loaded {:?} as {} {}",
        source.path, source.layout, dims
    );
    Ok(normalized)
}

/// `Ok(None)` when the file is absent; malformed content is an error
fn load_coordinates(path: &Path) -> Result<Option<CoordinateTable>> {
    match CoordinateTable::load(path) {
        Ok(table) => {
            info!("Loaded {} coordinate records from {:?}", table.len(), path);
            Ok(Some(table))
        }
        Err(e) if e.kind() == ErrorKind::MissingResource => {
            warn!("Coordinate file {:?} not found, falling back to full comparison", path);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
