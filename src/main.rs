//! pillar-verify CLI - check a PillarScatter output grid against a reference

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use pillar_verify::config::{DEFAULT_OUTPUT_PATH, DEFAULT_REFERENCE_PATH};
use pillar_verify::{
    ErrorKind, GridDims, Layout, VerificationOutcome, Verifier, VerifyConfig, VERSION,
};

/// Verify PillarScatter operator output against a reference dump
#[derive(Parser, Debug)]
#[command(name = "pillar-verify")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Operator output grid (raw little-endian f16)
    #[arg(default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Reference grid (raw little-endian f16)
    #[arg(default_value = DEFAULT_REFERENCE_PATH)]
    reference: PathBuf,

    /// YAML config file; command-line options override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Coordinate stream (u32 records: batch, x, y, reserved)
    #[arg(long)]
    coords: Option<PathBuf>,

    /// Skip coordinate-restricted comparison entirely
    #[arg(long, conflicts_with_all = ["coords", "window"])]
    no_coords: bool,

    /// Number of leading coordinate records the operator run consumed
    #[arg(short, long)]
    window: Option<usize>,

    /// Grid height
    #[arg(long)]
    height: Option<usize>,

    /// Grid width
    #[arg(long)]
    width: Option<usize>,

    /// Grid channels
    #[arg(long)]
    channels: Option<usize>,

    /// Layout of the output grid (channel_last | channel_first)
    #[arg(long)]
    output_layout: Option<Layout>,

    /// Layout of the reference grid (channel_last | channel_first)
    #[arg(long)]
    reference_layout: Option<Layout>,

    /// Relative tolerance
    #[arg(long)]
    rtol: Option<f64>,

    /// Absolute tolerance
    #[arg(long)]
    atol: Option<f64>,

    /// Write a JSON report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    show_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<VerifyConfig> {
        let mut config = match &self.config {
            Some(path) => VerifyConfig::load(path)
                .with_context(|| format!("Failed to load config {:?}", path))?,
            None => VerifyConfig::default(),
        };

        // Positionals always carry a value; only replace file values when changed
        if self.config.is_none() || self.output.as_os_str() != DEFAULT_OUTPUT_PATH {
            config.output.path = self.output;
        }
        if self.config.is_none() || self.reference.as_os_str() != DEFAULT_REFERENCE_PATH {
            config.reference.path = self.reference;
        }
        if let Some(layout) = self.output_layout {
            config.output.layout = layout;
        }
        if let Some(layout) = self.reference_layout {
            config.reference.layout = layout;
        }

        let GridDims {
            height,
            width,
            channels,
        } = config.dims;
        config.dims = GridDims::new(
            self.height.unwrap_or(height),
            self.width.unwrap_or(width),
            self.channels.unwrap_or(channels),
        );

        if let Some(rtol) = self.rtol {
            config.tolerance.rtol = rtol;
        }
        if let Some(atol) = self.atol {
            config.tolerance.atol = atol;
        }
        if self.no_coords {
            config.coords = None;
            config.window = None;
        }
        if self.coords.is_some() {
            config.coords = self.coords;
        }
        if self.window.is_some() {
            config.window = self.window;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn create_progress_bar(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb
}

fn error_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::MissingResource => "missing input",
        ErrorKind::Parse => "malformed input",
        ErrorKind::InsufficientData => "insufficient data",
        ErrorKind::ShapeMismatch => "shape/size mismatch",
        ErrorKind::Config => "configuration error",
        ErrorKind::Internal => "internal error",
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    info!("pillar-verify v{}", VERSION);

    let show_config = cli.show_config;
    let report_path = cli.report.clone();
    let config = cli.into_config()?;

    if show_config {
        println!("{}", serde_yaml::to_string(&config).context("Failed to render config")?);
        return Ok(ExitCode::SUCCESS);
    }

    info!("Output:    {:?} ({})", config.output.path, config.output.layout);
    info!("Reference: {:?} ({})", config.reference.path, config.reference.layout);
    match config.restricted_inputs() {
        Some((coords, window)) => {
            info!("Restricted mode: first {} records of {:?}", window, coords)
        }
        None => info!("Full comparison mode"),
    }

    let pb = create_progress_bar("Loading and comparing grids...");
    let report = Verifier::new(config).run();
    pb.finish_and_clear();

    if let Some(path) = &report_path {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report {:?}", path))?;
        info!("Report written to {:?}", path);
    }

    if let VerificationOutcome::StructurallyInvalid { error } = &report.outcome {
        eprintln!("✗ {}: {}", error_label(error.kind()), error);
        return Ok(ExitCode::FAILURE);
    }

    report.print_summary();
    Ok(ExitCode::from(report.outcome.exit_code() as u8))
}
