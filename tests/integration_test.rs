//! Integration tests for pillar-verify
//!
//! Drives the verifier end to end over grid and coordinate files on disk.

use half::f16;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use pillar_verify::grid::from_canonical;
use pillar_verify::{
    CoordinateRecord, CoordinateTable, ErrorKind, Grid, GridDims, GridSource, Layout,
    Tolerance, VerificationOutcome, Verifier, VerifyConfig,
};
use pillar_verify::debug::RestrictedOutcome;
use pillar_verify::verify::Fallback;

const DIMS: GridDims = GridDims {
    height: 6,
    width: 5,
    channels: 3,
};

/// Grid that is zero everywhere except the cells named by `cells`
fn scattered(cells: &[(usize, usize)]) -> Grid {
    let mut grid = Grid::zeros(DIMS);
    for (i, &(x, y)) in cells.iter().enumerate() {
        for c in 0..DIMS.channels {
            grid.set(y, x, c, f16::from_f32(1.0 + i as f32 + c as f32 * 0.5));
        }
    }
    grid
}

fn write_grid(dir: &Path, name: &str, grid: &Grid, layout: Layout) -> PathBuf {
    let path = dir.join(name);
    let bytes: Vec<u8> = from_canonical(grid, layout)
        .unwrap()
        .iter()
        .flat_map(|v| v.to_bits().to_le_bytes())
        .collect();
    fs::write(&path, bytes).unwrap();
    path
}

fn write_coords(dir: &Path, records: &[(u32, u32, u32, u32)]) -> PathBuf {
    let path = dir.join("coords.bin");
    let table: CoordinateTable = records
        .iter()
        .map(|&(b, x, y, r)| CoordinateRecord::new(b, x, y, r))
        .collect();
    fs::write(&path, table.to_bytes()).unwrap();
    path
}

fn config(output: PathBuf, reference: PathBuf) -> VerifyConfig {
    VerifyConfig {
        output: GridSource::new(output, Layout::ChannelLast),
        reference: GridSource::new(reference, Layout::ChannelFirst),
        dims: DIMS,
        tolerance: Tolerance::default(),
        coords: None,
        window: None,
    }
}

const PILLARS: [(u32, u32, u32, u32); 4] = [(0, 1, 2, 0), (0, 4, 5, 0), (1, 0, 0, 0), (0, 2, 0, 0)];

fn pillar_cells(n: usize) -> Vec<(usize, usize)> {
    PILLARS
        .iter()
        .take(n)
        .filter(|p| p.0 == 0)
        .map(|p| (p.1 as usize, p.2 as usize))
        .collect()
}

#[test]
fn test_full_mode_layouts_reconciled() {
    let dir = TempDir::new().unwrap();
    let grid = scattered(&pillar_cells(4));
    let output = write_grid(dir.path(), "out.bin", &grid, Layout::ChannelLast);
    let reference = write_grid(dir.path(), "ref.bin", &grid, Layout::ChannelFirst);

    let report = Verifier::new(config(output, reference)).run();
    match &report.outcome {
        VerificationOutcome::FullyVerified { full, fallback } => {
            assert!(fallback.is_none());
            assert!(full.numeric.as_ref().unwrap().exact);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(report.passed());
    assert_eq!(report.outcome.exit_code(), 0);
    assert_eq!(report.diagnostics.output_stats, report.diagnostics.reference_stats);
}

#[test]
fn test_truncated_run_passes_restricted_mode() {
    let dir = TempDir::new().unwrap();
    // the operator only scattered the first two pillars
    let output_grid = scattered(&pillar_cells(2));
    let reference_grid = scattered(&pillar_cells(4));
    let output = write_grid(dir.path(), "out.bin", &output_grid, Layout::ChannelLast);
    let reference = write_grid(dir.path(), "ref.bin", &reference_grid, Layout::ChannelFirst);

    let mut cfg = config(output, reference);
    cfg.coords = Some(write_coords(dir.path(), &PILLARS));
    cfg.window = Some(2);

    let report = Verifier::new(cfg).run();
    match &report.outcome {
        VerificationOutcome::RestrictedVerified { restricted, full } => {
            assert_eq!(restricted.checked, 2);
            assert_eq!(restricted.matched, 2);
            assert_eq!(restricted.outcome(), RestrictedOutcome::Pass);
            assert!(!full.passed());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(report.passed());

    let coverage = report.diagnostics.output_coverage.as_ref().unwrap();
    assert_eq!(coverage.expected_positions, 2);
    assert!(coverage.complete());
    assert_eq!(report.diagnostics.coordinate_records, Some(4));
}

#[test]
fn test_wrong_value_inside_window_fails_restricted_mode() {
    let dir = TempDir::new().unwrap();
    let reference_grid = scattered(&pillar_cells(4));
    let mut output_grid = reference_grid.clone();
    output_grid.set(5, 4, 2, f16::from_f32(-8.0));
    let output = write_grid(dir.path(), "out.bin", &output_grid, Layout::ChannelLast);
    let reference = write_grid(dir.path(), "ref.bin", &reference_grid, Layout::ChannelFirst);

    let mut cfg = config(output, reference);
    cfg.coords = Some(write_coords(dir.path(), &PILLARS));
    cfg.window = Some(4);

    let report = Verifier::new(cfg).run();
    let restricted = report.outcome.restricted().unwrap();
    assert_eq!(restricted.checked, 3);
    assert_eq!(restricted.matched, 2);
    assert_eq!(restricted.skipped, 1);
    assert_eq!(restricted.failures[0].record_index, 1);
    assert!(!report.passed());
    assert_eq!(report.outcome.exit_code(), 1);
}

#[test]
fn test_no_eligible_cells_is_not_a_pass() {
    let dir = TempDir::new().unwrap();
    let grid = scattered(&[]);
    let output = write_grid(dir.path(), "out.bin", &grid, Layout::ChannelLast);
    let reference = write_grid(dir.path(), "ref.bin", &grid, Layout::ChannelFirst);

    let mut cfg = config(output, reference);
    cfg.coords = Some(write_coords(dir.path(), &[(1, 0, 0, 0), (0, 99, 0, 0)]));
    cfg.window = Some(2);

    let report = Verifier::new(cfg).run();
    assert!(matches!(report.outcome, VerificationOutcome::Unverified { .. }));
    assert!(!report.passed());
}

#[test]
fn test_missing_coordinates_fall_back_to_full() {
    let dir = TempDir::new().unwrap();
    let grid = scattered(&pillar_cells(4));
    let output = write_grid(dir.path(), "out.bin", &grid, Layout::ChannelLast);
    let reference = write_grid(dir.path(), "ref.bin", &grid, Layout::ChannelFirst);

    let mut cfg = config(output, reference);
    cfg.coords = Some(dir.path().join("absent.bin"));
    cfg.window = Some(3);

    let report = Verifier::new(cfg).run();
    match &report.outcome {
        VerificationOutcome::FullyVerified {
            fallback: Some(Fallback::CoordinatesMissing { path }),
            ..
        } => assert!(path.ends_with("absent.bin")),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(report.passed());
}

#[test]
fn test_malformed_coordinates_are_terminal() {
    let dir = TempDir::new().unwrap();
    let grid = scattered(&[]);
    let output = write_grid(dir.path(), "out.bin", &grid, Layout::ChannelLast);
    let reference = write_grid(dir.path(), "ref.bin", &grid, Layout::ChannelFirst);
    let coords = dir.path().join("coords.bin");
    fs::write(&coords, [0u8; 18]).unwrap();

    let mut cfg = config(output, reference);
    cfg.coords = Some(coords);
    cfg.window = Some(1);

    let report = Verifier::new(cfg).run();
    match &report.outcome {
        VerificationOutcome::StructurallyInvalid { error } => {
            assert_eq!(error.kind(), ErrorKind::Parse)
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_missing_grid_is_structural_failure() {
    let dir = TempDir::new().unwrap();
    let grid = scattered(&[]);
    let reference = write_grid(dir.path(), "ref.bin", &grid, Layout::ChannelFirst);

    let report = Verifier::new(config(dir.path().join("out.bin"), reference)).run();
    match &report.outcome {
        VerificationOutcome::StructurallyInvalid { error } => {
            assert_eq!(error.kind(), ErrorKind::MissingResource)
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(report.outcome.exit_code(), 1);
}

#[test]
fn test_size_mismatch_is_structural_failure() {
    let dir = TempDir::new().unwrap();
    let grid = scattered(&[]);
    let output = write_grid(dir.path(), "out.bin", &grid, Layout::ChannelLast);
    let reference = dir.path().join("ref.bin");
    fs::write(&reference, vec![0u8; DIMS.byte_len() - 2]).unwrap();

    let report = Verifier::new(config(output, reference)).run();
    match &report.outcome {
        VerificationOutcome::StructurallyInvalid { error } => {
            assert_eq!(error.kind(), ErrorKind::ShapeMismatch);
            assert!(error.to_string().contains("size mismatch"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_undersized_grids_are_insufficient_data() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.bin");
    let reference = dir.path().join("ref.bin");
    fs::write(&output, vec![0u8; 20]).unwrap();
    fs::write(&reference, vec![0u8; 20]).unwrap();

    let report = Verifier::new(config(output, reference)).run();
    match &report.outcome {
        VerificationOutcome::StructurallyInvalid { error } => {
            assert_eq!(error.kind(), ErrorKind::InsufficientData)
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_oversized_grids_are_truncated_and_flagged() {
    let dir = TempDir::new().unwrap();
    let grid = scattered(&pillar_cells(4));
    let output = write_grid(dir.path(), "out.bin", &grid, Layout::ChannelLast);
    let reference = write_grid(dir.path(), "ref.bin", &grid, Layout::ChannelLast);
    for path in [&output, &reference] {
        let mut bytes = fs::read(path).unwrap();
        bytes.extend_from_slice(&[0x3c, 0x00, 0x3c, 0x00]);
        fs::write(path, bytes).unwrap();
    }

    let mut cfg = config(output, reference);
    cfg.reference.layout = Layout::ChannelLast;
    let report = Verifier::new(cfg).run();
    assert!(report.passed());
    let truncated = report.diagnostics.output_truncated.unwrap();
    assert_eq!(truncated.expected, DIMS.element_count());
    assert_eq!(truncated.actual, DIMS.element_count() + 2);
}

#[test]
fn test_config_file_drives_run() {
    let dir = TempDir::new().unwrap();
    let grid = scattered(&pillar_cells(2));
    let output = write_grid(dir.path(), "out.bin", &grid, Layout::ChannelFirst);
    let reference = write_grid(dir.path(), "ref.bin", &grid, Layout::ChannelLast);
    let coords = write_coords(dir.path(), &PILLARS);

    let yaml = format!(
        "dims: {{ height: 6, width: 5, channels: 3 }}\n\
         output: {{ path: {:?}, layout: nchw }}\n\
         reference: {{ path: {:?}, layout: nhwc }}\n\
         coords: {:?}\n\
         window: 2\n",
        output, reference, coords
    );
    let config_path = dir.path().join("verify.yaml");
    fs::write(&config_path, yaml).unwrap();

    let cfg = VerifyConfig::load(&config_path).unwrap();
    let report = Verifier::new(cfg).run();
    assert_eq!(report.outcome.state(), "restricted_verified");
    assert!(report.passed());

    let json_path = dir.path().join("report.json");
    report.write_json(&json_path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["passed"], true);
    assert_eq!(json["restricted"]["checked"], 2);
}
