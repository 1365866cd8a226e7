//! Verification entry point
//!
//! - Verifier: loads, normalizes and compares the configured grids
//! - VerificationOutcome: tagged final state of a run
//! - Report rendering (stdout summary, JSON)

mod driver;
mod report;

pub use driver::{
    verify_grids, Diagnostics, Fallback, VerificationOutcome, VerificationReport, Verifier,
};
pub use report::JsonReport;
