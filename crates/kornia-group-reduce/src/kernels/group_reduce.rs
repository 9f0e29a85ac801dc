//! Row-wise group reduction on GPU.
//!
//! This module provides the CubeCL version of the two-phase reduction:
//! a shared-memory tree for rows wider than one plane, then plane shuffles.

#![allow(missing_docs)]

use cubecl::prelude::*;

/// Combine operator callable from cube functions.
#[cube]
pub trait CubeCombine<N: Numeric>: 'static + Send + Sync {
    fn combine(a: N, b: N) -> N;
}

/// Host-side identity of a [`CubeCombine`] operator, written into padded
/// positions of a segment.
pub trait DeviceCombine<N: Numeric>: CubeCombine<N> {
    fn identity() -> N;
}

/// Minimum.
#[derive(Debug, Clone, Copy)]
pub struct MinOp;

#[cube]
impl<N: Numeric> CubeCombine<N> for MinOp {
    fn combine(a: N, b: N) -> N {
        select(b < a, b, a)
    }
}

impl<N: Numeric> DeviceCombine<N> for MinOp {
    fn identity() -> N {
        N::max_value()
    }
}

/// Maximum.
#[derive(Debug, Clone, Copy)]
pub struct MaxOp;

#[cube]
impl<N: Numeric> CubeCombine<N> for MaxOp {
    fn combine(a: N, b: N) -> N {
        select(b > a, b, a)
    }
}

impl<N: Numeric> DeviceCombine<N> for MaxOp {
    fn identity() -> N {
        N::min_value()
    }
}

/// Sum.
#[derive(Debug, Clone, Copy)]
pub struct SumOp;

#[cube]
impl<N: Numeric> CubeCombine<N> for SumOp {
    fn combine(a: N, b: N) -> N {
        a + b
    }
}

impl<N: Numeric> DeviceCombine<N> for SumOp {
    fn identity() -> N {
        N::from_int(0)
    }
}

/// Reduce `value` across the calling unit's row (`UNIT_POS_Y`).
///
/// Column 0 of every row returns the row result. `CUBE_DIM_X` must be a
/// power of two, and `shared` must hold `CUBE_DIM_X * CUBE_DIM_Y` values.
///
/// # Thread Model
///
/// - Rows wider than `PLANE_DIM` fold into the first plane through shared
///   memory, one `sync_units` per halving
/// - The first plane finishes with `plane_shuffle_down`, no shared memory
/// - Narrower rows skip the shared-memory phase entirely
#[cube]
pub fn group_x_reduce<N: Numeric, C: CubeCombine<N>>(
    shared: &mut SharedMemory<N>,
    value: N,
) -> N {
    let col = UNIT_POS_X;
    let cols = CUBE_DIM_X;
    let lane_width = PLANE_DIM;

    let mut acc = value;
    let mut width = cols;

    if cols > lane_width {
        let base = UNIT_POS_Y * cols + col;
        shared[base] = acc;

        let mut offset = cols / 2;
        while offset >= lane_width {
            sync_units();

            if col < offset && col + offset < cols {
                acc = C::combine(acc, shared[base + offset]);
                shared[base] = acc;
            }

            offset /= 2;
        }
        width = lane_width;
    }

    let mut offset = 1u32;
    while offset < width {
        let other = plane_shuffle_down(acc, offset);
        acc = C::combine(acc, other);
        offset *= 2;
    }

    acc
}

/// Segment reduction kernel.
///
/// Unit `(x, y)` of cube `c` handles position `x` of segment
/// `c * CUBE_DIM_Y + y`. Positions past `problem_size` and segments past
/// `nsegments` contribute `identity`; column 0 writes the segment result.
///
/// # Arguments
///
/// * `input` - Segment-major input, `nsegments * problem_size` values
/// * `output` - One value per segment
/// * `scratch_len` - Shared memory size, `CUBE_DIM_X * CUBE_DIM_Y`
#[cube(launch_unchecked)]
pub fn segment_reduce_kernel<N: Numeric, C: CubeCombine<N>>(
    input: &Array<N>,
    output: &mut Array<N>,
    problem_size: u32,
    nsegments: u32,
    identity: N,
    #[comptime] scratch_len: u32,
) {
    let segment = CUBE_POS_X * CUBE_DIM_Y + UNIT_POS_Y;
    let position = UNIT_POS_X;

    let mut shared = SharedMemory::<N>::new(scratch_len);

    let mut value = identity;
    if segment < nsegments && position < problem_size {
        value = input[segment * problem_size + position];
    }

    let reduced = group_x_reduce::<N, C>(&mut shared, value);

    if position == 0 && segment < nsegments {
        output[segment] = reduced;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_identities() {
        assert_eq!(<MinOp as DeviceCombine<u32>>::identity(), u32::MAX);
        assert_eq!(<MaxOp as DeviceCombine<i32>>::identity(), i32::MIN);
        assert_eq!(<SumOp as DeviceCombine<u32>>::identity(), 0);
    }
}
