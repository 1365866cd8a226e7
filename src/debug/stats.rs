//! Grid statistics and scatter coverage
//!
//! Diagnostic only: nothing here changes a verification outcome.

use serde::{Deserialize, Serialize};

use crate::grid::{CoordinateTable, Grid};

/// Number of leading coordinate records reported individually by [`coverage`]
pub const COVERAGE_SAMPLES: usize = 5;

/// Summary statistics of one grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridStats {
    /// Smallest non-NaN value
    pub min: f64,
    /// Largest non-NaN value
    pub max: f64,
    /// Mean of non-NaN values
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    /// Element count, NaN included
    pub total_elements: usize,
    /// Elements not equal to zero
    pub nonzero_count: usize,
    /// NaN elements (excluded from min/max/mean/std)
    pub nan_count: usize,
    /// Non-zero count per channel
    pub channel_nonzero: Vec<usize>,
}

impl GridStats {
    /// Compute statistics over every element
    pub fn compute(grid: &Grid) -> Self {
        let channels = grid.dims().channels;
        let mut channel_nonzero = vec![0usize; channels];
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        let mut nonzero_count = 0;
        let mut nan_count = 0;

        for (i, v) in grid.data().iter().enumerate() {
            let v = f64::from(*v);
            if v.is_nan() {
                nan_count += 1;
                continue;
            }
            if v != 0.0 {
                nonzero_count += 1;
                channel_nonzero[i % channels] += 1;
            }
            min = min.min(v);
            max = max.max(v);
            sum += v;
            sum_sq += v * v;
        }

        let counted = grid.data().len() - nan_count;
        let (min, max, mean, std) = if counted == 0 {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let mean = sum / counted as f64;
            let var = (sum_sq / counted as f64 - mean * mean).max(0.0);
            (min, max, mean, var.sqrt())
        };

        Self {
            min,
            max,
            mean,
            std,
            total_elements: grid.data().len(),
            nonzero_count,
            nan_count,
            channel_nonzero,
        }
    }

    /// Non-zero fraction in percent
    pub fn nonzero_ratio(&self) -> f64 {
        if self.total_elements == 0 {
            return 0.0;
        }
        self.nonzero_count as f64 / self.total_elements as f64 * 100.0
    }

    /// Print a summary, listing at most `max_channels` channels
    pub fn print_summary(&self, name: &str, max_channels: usize) {
        println!("\n{} statistics:", name);
        println!("  min:  {:.6}", self.min);
        println!("  max:  {:.6}", self.max);
        println!("  mean: {:.6}", self.mean);
        println!("  std:  {:.6}", self.std);
        println!(
            "  non-zero: {} of {} ({:.4}%)",
            self.nonzero_count,
            self.total_elements,
            self.nonzero_ratio()
        );
        if self.nan_count > 0 {
            println!("  NaN: {}", self.nan_count);
        }
        for (c, count) in self.channel_nonzero.iter().take(max_channels).enumerate() {
            println!("  channel {:2}: {} non-zero", c, count);
        }
        if self.channel_nonzero.len() > max_channels {
            println!(
                "  ... ({} more channels)",
                self.channel_nonzero.len() - max_channels
            );
        }
    }
}

/// Written-channel count at one of the leading coordinate records
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSample {
    pub record_index: usize,
    pub x: usize,
    pub y: usize,
    pub nonzero_channels: usize,
}

/// Whether a truncated run wrote every cell its coordinate prefix names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    /// Eligible records in the window
    pub expected_positions: usize,
    /// Eligible records whose cell holds at least one non-zero channel
    pub written_positions: usize,
    /// Eligible records among the first [`COVERAGE_SAMPLES`] of the stream
    pub samples: Vec<CoverageSample>,
}

impl Coverage {
    /// Every expected position was written
    pub fn complete(&self) -> bool {
        self.expected_positions == self.written_positions
    }
}

/// Count eligible cells in `window` that hold any non-zero value in `grid`
pub fn coverage(grid: &Grid, coords: &CoordinateTable, window: usize) -> Coverage {
    let mut expected_positions = 0;
    let mut written_positions = 0;
    let mut samples = Vec::new();

    for (record_index, rec) in coords.eligible(window, grid.dims()) {
        let (x, y) = (rec.x as usize, rec.y as usize);
        let nonzero_channels = grid.cell(y, x).iter().filter(|v| f64::from(**v) != 0.0).count();

        expected_positions += 1;
        if nonzero_channels > 0 {
            written_positions += 1;
        }
        if record_index < COVERAGE_SAMPLES {
            samples.push(CoverageSample {
                record_index,
                x,
                y,
                nonzero_channels,
            });
        }
    }

    Coverage {
        expected_positions,
        written_positions,
        samples,
    }
}
