//! Human-readable and JSON rendering of a verification report

use serde::Serialize;
use std::path::Path;

use super::driver::{Diagnostics, Fallback, VerificationOutcome, VerificationReport};
use crate::debug::{Coverage, FullVerdict, RestrictedVerdict};
use crate::error::{Result, VerifyError};

/// Channels listed per grid in the statistics block
const SUMMARY_CHANNELS: usize = 10;

/// Serializable view of a [`VerificationReport`]
#[allow(missing_docs)]
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    /// Overall pass/fail
    pub passed: bool,
    /// Terminal state name
    pub state: &'static str,
    /// Structural error message, if the run stopped early
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Why full comparison was authoritative
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<&'a Fallback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full: Option<&'a FullVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricted: Option<&'a RestrictedVerdict>,
    pub diagnostics: &'a Diagnostics,
}

impl<'a> From<&'a VerificationReport> for JsonReport<'a> {
    fn from(report: &'a VerificationReport) -> Self {
        let outcome = &report.outcome;
        let (error, fallback) = match outcome {
            VerificationOutcome::StructurallyInvalid { error } => (Some(error.to_string()), None),
            VerificationOutcome::FullyVerified { fallback, .. } => (None, fallback.as_ref()),
            _ => (None, None),
        };
        Self {
            passed: outcome.passed(),
            state: outcome.state(),
            error,
            fallback,
            full: outcome.full(),
            restricted: outcome.restricted(),
            diagnostics: &report.diagnostics,
        }
    }
}

impl VerificationReport {
    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&JsonReport::from(self))
            .map_err(|e| VerifyError::Config(format!("cannot serialize report: {}", e)))
    }

    /// Write the JSON rendering to `path`
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|e| VerifyError::from_io(path, e))
    }

    /// Print the full report to stdout
    pub fn print_summary(&self) {
        let diag = &self.diagnostics;
        for (name, truncated) in [
            ("output", diag.output_truncated),
            ("reference", diag.reference_truncated),
        ] {
            if let Some(t) = truncated {
                println!(
                    "! {} buffer holds {} elements, compared the first {}",
                    name, t.actual, t.expected
                );
            }
        }
        if let Some(stats) = &diag.output_stats {
            stats.print_summary("Output", SUMMARY_CHANNELS);
        }
        if let Some(stats) = &diag.reference_stats {
            stats.print_summary("Reference", SUMMARY_CHANNELS);
        }
        if let Some(cov) = &diag.output_coverage {
            print_coverage("Output", cov);
        }
        if let Some(cov) = &diag.reference_coverage {
            print_coverage("Reference", cov);
        }

        println!("\n=== Verification Summary ===\n");
        match &self.outcome {
            VerificationOutcome::StructurallyInvalid { error } => {
                println!("✗ {}", error);
            }
            VerificationOutcome::Unverified { restricted, full } => {
                print_full(full);
                print_restricted(restricted);
                println!("\n✗ No eligible coordinate cells: nothing was verified");
                println!("  Check the coordinate stream, window and grid layout");
            }
            VerificationOutcome::RestrictedVerified { restricted, full } => {
                print_full(full);
                print_restricted(restricted);
                if self.passed() {
                    println!(
                        "\n✓ Restricted verification passed for the first {} records",
                        restricted.window
                    );
                } else {
                    println!(
                        "\n✗ Restricted verification failed for the first {} records",
                        restricted.window
                    );
                }
            }
            VerificationOutcome::FullyVerified { full, fallback } => {
                if let Some(reason) = fallback {
                    match reason {
                        Fallback::NoWindow => {
                            println!("(no truncation window given, full comparison is authoritative)")
                        }
                        Fallback::CoordinatesMissing { path } => println!(
                            "(coordinate file {:?} not found, full comparison is authoritative)",
                            path
                        ),
                    }
                }
                print_full(full);
                if self.passed() {
                    println!("\n✓ Full verification passed");
                } else {
                    println!("\n✗ Full verification failed");
                }
            }
        }
    }
}

fn print_full(full: &FullVerdict) {
    println!("{}", full.summary());
    let Some(n) = &full.numeric else {
        return;
    };
    if n.mismatches.is_empty() {
        return;
    }
    println!("  First {} of {} mismatches:", n.mismatches.len(), n.mismatch_count);
    for m in &n.mismatches {
        println!(
            "    {}: output={:.6}, reference={:.6}, diff={:.2e}",
            m.position, m.actual, m.expected, m.abs_diff
        );
    }
}

fn print_restricted(restricted: &RestrictedVerdict) {
    println!("{}", restricted.summary());
    for cell in &restricted.failures {
        println!(
            "  record {} at ({}, {}): {} channel(s) outside tolerance",
            cell.record_index, cell.x, cell.y, cell.failing_channels
        );
        for ch in &cell.channels {
            println!(
                "    channel {}: {:.6} vs {:.6}",
                ch.channel, ch.actual, ch.expected
            );
        }
    }
}

fn print_coverage(name: &str, cov: &Coverage) {
    println!("\n{} coverage:", name);
    for s in &cov.samples {
        println!(
            "  pillar {}: ({}, {}) -> {} non-zero channel(s)",
            s.record_index, s.x, s.y, s.nonzero_channels
        );
    }
    let mark = if cov.complete() { "✓" } else { "✗" };
    println!(
        "  {} {}/{} expected positions written",
        mark, cov.written_positions, cov.expected_positions
    );
}
