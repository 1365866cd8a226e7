//! Property-based tests for layout normalization and grid comparison.

use half::f16;
use pillar_verify::grid::{from_canonical, to_canonical};
use pillar_verify::{
    compare_full, compare_restricted, CoordinateRecord, CoordinateTable, Grid, GridDims, Layout,
    Tolerance,
};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────────

fn arb_dims() -> impl Strategy<Value = GridDims> {
    (1usize..=6, 1usize..=6, 1usize..=5).prop_map(|(h, w, c)| GridDims::new(h, w, c))
}

/// Arbitrary bit patterns, NaN payloads and infinities included
fn arb_buffer(dims: GridDims) -> impl Strategy<Value = Vec<f16>> {
    prop::collection::vec(any::<u16>().prop_map(f16::from_bits), dims.element_count())
}

/// Finite values in a moderate range
fn arb_finite_grid(dims: GridDims) -> impl Strategy<Value = Grid> {
    prop::collection::vec(-64.0f32..64.0, dims.element_count()).prop_map(move |v| {
        Grid::from_channel_last(dims, v.into_iter().map(f16::from_f32).collect()).unwrap()
    })
}

fn arb_grid_pair() -> impl Strategy<Value = (Grid, Grid)> {
    arb_dims().prop_flat_map(|dims| (arb_finite_grid(dims), arb_finite_grid(dims)))
}

fn bits(values: &[f16]) -> Vec<u16> {
    values.iter().map(|v| v.to_bits()).collect()
}

// ── Property tests ───────────────────────────────────────────────────────────

proptest! {
    /// channel_first -> canonical -> channel_first is bit-for-bit identity.
    #[test]
    fn channel_first_round_trip_is_exact(
        (dims, flat) in arb_dims().prop_flat_map(|d| (Just(d), arb_buffer(d)))
    ) {
        let grid = to_canonical(&flat, Layout::ChannelFirst, dims).unwrap().grid;
        let back = from_canonical(&grid, Layout::ChannelFirst).unwrap();
        prop_assert_eq!(bits(&back), bits(&flat));
    }

    /// Normalization moves values to their logical cell without changing them.
    #[test]
    fn channel_first_value_addresses(
        (dims, flat) in arb_dims().prop_flat_map(|d| (Just(d), arb_buffer(d)))
    ) {
        let grid = to_canonical(&flat, Layout::ChannelFirst, dims).unwrap().grid;
        for c in 0..dims.channels {
            for y in 0..dims.height {
                for x in 0..dims.width {
                    let src = (c * dims.height + y) * dims.width + x;
                    prop_assert_eq!(grid.get(y, x, c).to_bits(), flat[src].to_bits());
                }
            }
        }
    }

    /// Any grid compared with itself is exact and tolerant.
    #[test]
    fn self_comparison_is_exact(
        (dims, flat) in arb_dims().prop_flat_map(|d| (Just(d), arb_buffer(d)))
    ) {
        let grid = Grid::from_channel_last(dims, flat).unwrap();
        let verdict = compare_full(&grid, &grid, Tolerance::new(0.0, 0.0));
        let numeric = verdict.numeric.unwrap();
        prop_assert!(numeric.exact);
        prop_assert!(numeric.tolerant);
    }

    /// Loosening either tolerance never turns a tolerant verdict intolerant.
    #[test]
    fn tolerance_is_monotone(
        (a, b) in arb_grid_pair(),
        rtol in 0.0f64..0.5,
        atol in 0.0f64..8.0,
        extra_r in 0.0f64..0.5,
        extra_a in 0.0f64..8.0,
    ) {
        let tight = compare_full(&a, &b, Tolerance::new(rtol, atol)).numeric.unwrap();
        let loose = compare_full(&a, &b, Tolerance::new(rtol + extra_r, atol + extra_a))
            .numeric
            .unwrap();
        if tight.tolerant {
            prop_assert!(loose.tolerant);
        }
        prop_assert!(loose.mismatch_count <= tight.mismatch_count || tight.tolerant);
    }

    /// Restricted comparison counts only active-batch, in-bounds records of the window.
    #[test]
    fn restricted_checked_counts_eligible_prefix(
        (a, b) in arb_grid_pair(),
        records in prop::collection::vec((0u32..3, 0u32..10, 0u32..10), 0..20),
        window in 0usize..25,
    ) {
        let dims = a.dims();
        let table: CoordinateTable = records
            .iter()
            .map(|&(batch, x, y)| CoordinateRecord::new(batch, x, y, 0))
            .collect();
        let verdict = compare_restricted(&a, &b, &table, window, Tolerance::default()).unwrap();

        let expected = records
            .iter()
            .take(window)
            .filter(|&&(batch, x, y)| batch == 0 && (x as usize) < dims.width && (y as usize) < dims.height)
            .count();
        prop_assert_eq!(verdict.checked, expected);
        prop_assert!(verdict.matched <= verdict.checked);
        prop_assert_eq!(verdict.checked + verdict.skipped, window.min(records.len()));
    }
}
