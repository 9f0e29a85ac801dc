//! Tests for segment reductions on the CPU block emulation

use kornia_group_reduce::*;
use proptest::prelude::*;

const W: usize = DEFAULT_LANE_WIDTH;
const WIDTHS: [usize; 6] = [1, W - 1, W, W + 1, 2 * W, 2 * W + 7];

fn pseudo_random(n: usize, seed: u64) -> Vec<i32> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) % 2001) as i32 - 1000
        })
        .collect()
}

#[test]
fn test_min_matches_sequential_for_all_widths() {
    for (i, &cols) in WIDTHS.iter().enumerate() {
        let geometry = BlockGeometry::new(3, cols);
        let input = pseudo_random(3 * cols, i as u64);
        let op = Min::default();

        let got = segment_reduce(&input, cols, &geometry, &op).unwrap();
        let expected = segment_reduce_reference(&input, cols, &op).unwrap();
        assert_eq!(got, expected, "cols = {cols}");
    }
}

#[test]
fn test_sum_matches_sequential_for_all_widths() {
    for (i, &cols) in WIDTHS.iter().enumerate() {
        let geometry = BlockGeometry::new(2, cols);
        let input = pseudo_random(5 * cols, 100 + i as u64);

        let got = segment_reduce(&input, cols, &geometry, &Sum).unwrap();
        let expected = segment_reduce_reference(&input, cols, &Sum).unwrap();
        assert_eq!(got, expected, "cols = {cols}");
    }
}

#[test]
fn test_boolean_minimum_scenario() {
    let input = [
        false, true, true, false, false, //
        true, false, true, false, true, //
        true, true, true, true, true, //
        true, true, false, false, false,
    ];
    let geometry = BlockGeometry::new(4, 32);
    let result =
        segment_reduce_with_stats(&input, 5, &geometry, &Min::with_identity(true)).unwrap();

    assert_eq!(result.values, vec![false, false, true, false]);
    assert_eq!(result.blocks, 1);
    assert_eq!(result.stats.barrier_rounds, 0);
    assert_eq!(result.stats.scratch_writes, 0);
}

#[test]
fn test_narrow_rows_never_touch_scratch() {
    for cols in [1, 2, 7, W - 1, W] {
        let geometry = BlockGeometry::new(2, cols);
        let scratch = SharedScratch::zeroed(geometry.scratch_len());
        let run = launch_block(&geometry, 0, &scratch, |item, scratch| {
            group_reduce(item, scratch, item.col() as i64, &Sum)
        })
        .unwrap();

        let expected = (cols * (cols - 1) / 2) as i64;
        assert_eq!(run.column0(&geometry), vec![expected; 2], "cols = {cols}");
        assert!(scratch.is_untouched(), "cols = {cols}");
        assert_eq!(run.stats.barrier_rounds, 0, "cols = {cols}");
    }
}

#[test]
fn test_wide_rows_barrier_rounds() {
    for cols in [W + 1, 2 * W, 2 * W + 7, 4 * W, 5 * W] {
        let geometry = BlockGeometry::new(2, cols);
        let scratch = SharedScratch::zeroed(geometry.scratch_len());
        let run = launch_block(&geometry, 0, &scratch, |item, scratch| {
            group_reduce(item, scratch, 1u32, &Sum)
        })
        .unwrap();

        let expected_rounds = ((cols as f64) / (W as f64)).log2().ceil() as usize;
        assert_eq!(run.stats.barrier_rounds, expected_rounds, "cols = {cols}");
        assert_eq!(run.column0(&geometry), vec![cols as u32; 2], "cols = {cols}");
    }
}

#[test]
fn test_rerun_with_fresh_scratch_is_bit_identical() {
    let geometry = BlockGeometry::new(2, 2 * W + 7);
    let values: Vec<f32> = (0..geometry.threads())
        .map(|i| (i as f32 * 0.37).sin() * 1e3)
        .collect();

    let run_once = || {
        let scratch = SharedScratch::zeroed(geometry.scratch_len());
        launch_block(&geometry, 0, &scratch, |item, scratch| {
            group_reduce(item, scratch, values[item.linear_id()], &Sum)
        })
        .unwrap()
        .column0(&geometry)
    };

    let first: Vec<u32> = run_once().iter().map(|v| v.to_bits()).collect();
    let second: Vec<u32> = run_once().iter().map(|v| v.to_bits()).collect();
    assert_eq!(first, second);
}

#[test]
fn test_shared_memory_only_matches_reference() {
    for (i, &cols) in WIDTHS.iter().enumerate() {
        let geometry = BlockGeometry::shared_memory_only(2, cols);
        let input = pseudo_random(4 * cols, 200 + i as u64);

        let result = segment_reduce_with_stats(&input, cols, &geometry, &Max::default()).unwrap();
        let expected = segment_reduce_reference(&input, cols, &Max::default()).unwrap();
        assert_eq!(result.values, expected, "cols = {cols}");
        assert_eq!(result.stats.shuffle_rounds, 0, "cols = {cols}");
    }
}

/// `x -> a * x + b` modulo a prime; composition is associative but not commutative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Affine(u64, u64);

const P: u64 = 1_000_003;

fn compose(f: Affine, g: Affine) -> Affine {
    // apply f, then g
    Affine((g.0 * f.0) % P, (g.0 * f.1 + g.1) % P)
}

#[test]
fn test_non_commutative_operator_keeps_row_order() {
    let op = combine_fn(Affine(1, 0), compose);
    for cols in [3, 5, 16, W - 1, W] {
        let input: Vec<Affine> = (0..2 * cols as u64)
            .map(|i| Affine(2 + i % 7, 3 + i % 11))
            .collect();
        let got = segment_reduce(&input, cols, &BlockGeometry::new(2, cols), &op).unwrap();
        let expected = segment_reduce_reference(&input, cols, &op).unwrap();
        assert_eq!(got, expected, "cols = {cols}");
    }
}

#[test]
fn test_padded_rows() {
    // problem size 20 in rows of 71 threads
    let input = pseudo_random(6 * 20, 7);
    let geometry = BlockGeometry::new(4, 2 * W + 7);
    let got = segment_reduce(&input, 20, &geometry, &Min::default()).unwrap();
    let expected = segment_reduce_reference(&input, 20, &Min::default()).unwrap();
    assert_eq!(got, expected);
}

#[test]
fn test_panicking_combine_reports_error() {
    let op = combine_fn(0i32, |a: i32, b: i32| {
        if a == 5 {
            panic!("unlucky");
        }
        a + b
    });
    let input: Vec<i32> = (0..64).collect();
    let err = segment_reduce(&input, 64, &BlockGeometry::new(1, 64), &op).unwrap_err();
    assert!(matches!(err, ReduceError::KernelPanicked { .. }), "{err}");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_matches_reference(
        rows in 1usize..4,
        cols in 1usize..80,
        seed in any::<u64>(),
    ) {
        let input = pseudo_random(rows * cols, seed);
        let geometry = BlockGeometry::new(rows, cols);

        let got = segment_reduce(&input, cols, &geometry, &Sum).unwrap();
        let expected = segment_reduce_reference(&input, cols, &Sum).unwrap();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_identity_placement_does_not_matter(
        values in prop::collection::vec(-1000i32..1000, 1..40),
        mask in prop::collection::vec(any::<bool>(), 70),
    ) {
        // Scatter the real values over a 70-wide row in the order given by
        // `mask`; every other slot holds the identity.
        let cols = 70;
        let op = Min::default();
        let mut row = vec![op.identity(); cols];
        let mut next = 0;
        for (slot, &take) in mask.iter().enumerate() {
            if take && next < values.len() {
                row[slot] = values[next];
                next += 1;
            }
        }
        for slot in row.iter_mut().rev() {
            if next == values.len() {
                break;
            }
            if *slot == op.identity() {
                *slot = values[next];
                next += 1;
            }
        }
        prop_assume!(next == values.len());

        let packed = {
            let mut v = values.clone();
            v.resize(cols, op.identity());
            v
        };

        let geometry = BlockGeometry::new(1, cols);
        let scattered = segment_reduce(&row, cols, &geometry, &op).unwrap();
        let contiguous = segment_reduce(&packed, cols, &geometry, &op).unwrap();
        prop_assert_eq!(&scattered, &contiguous);
        prop_assert_eq!(contiguous[0], values.iter().copied().min().unwrap());
    }
}
