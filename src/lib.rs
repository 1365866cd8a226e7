//! # pillar-verify
//!
//! Verification engine for PillarScatter operator outputs.
//!
//! The operator scatters sparse per-pillar feature vectors into a dense
//! `(1, H, W, C)` f16 grid. This crate checks such a grid against a reference
//! dump:
//!
//! - Channel-last and channel-first dumps are normalized to one channel-last view
//! - Full comparison reports exact and tolerance equality plus the first mismatches
//! - Restricted comparison checks only the cells named by the first `window`
//!   coordinate records, for truncated debug runs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pillar_verify::{Verifier, VerifyConfig};
//!
//! let mut config = VerifyConfig::default();
//! config.window = Some(9282);
//! let report = Verifier::new(config).run();
//! report.print_summary();
//! std::process::exit(report.outcome.exit_code());
//! ```

#![warn(missing_docs)]
#![allow(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod debug;
pub mod error;
pub mod grid;
pub mod verify;

// Re-exports for convenience
pub use config::{GridSource, VerifyConfig};
pub use debug::{compare_full, compare_restricted, FullVerdict, RestrictedVerdict, Tolerance};
pub use error::{ErrorKind, VerifyError};
pub use grid::{CoordinateRecord, CoordinateTable, Grid, GridDims, Layout};
pub use verify::{VerificationOutcome, VerificationReport, Verifier};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
