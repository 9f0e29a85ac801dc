//! Row-wise group reduction.

use crate::combine::Combine;
use crate::simt::{BlockItem, SharedScratch};

/// Reduce `value` across the row of the calling thread.
///
/// Every thread of the block must call this with the same geometry. On
/// return, column 0 of each row holds the combination of all `cols` input
/// values of that row. Lanes of the first lane group hold partial results
/// for their suffix of that group; other threads hold unspecified values.
///
/// The reduction runs in two phases:
///
/// 1. Rows wider than one lane group are folded in shared memory, halving
///    the live width each round with one block barrier per round, until a
///    single lane group remains.
/// 2. The remaining lane group finishes with register shuffles: no shared
///    memory and no block barrier.
///
/// Rows that fit in one lane group skip phase 1 entirely.
///
/// # Preconditions
///
/// The first two are checked once per launch by
/// [`launch_block`](crate::simt::launch_block); the others are up to the
/// caller.
///
/// - `scratch` holds at least `rows * cols` elements;
/// - the lane width is a power of two;
/// - `combine` is associative. It must also be commutative when
///   `cols > lane_width`, since phase 1 interleaves columns. For narrower
///   rows operands are combined in column order.
/// - `combine` does not panic. A panic poisons the block and the launch
///   fails instead of deadlocking.
pub fn group_reduce<T, C>(
    item: &BlockItem<'_, T>,
    scratch: &SharedScratch<T>,
    value: T,
    combine: &C,
) -> T
where
    T: Copy,
    C: Combine<T> + ?Sized,
{
    let geometry = item.geometry();
    let col = item.col();
    let cols = geometry.cols;
    let mut value = value;
    let mut width = cols;

    if cols > geometry.lane_width {
        let base = item.linear_id();
        scratch.store(base, value);
        let mut offset = geometry.tree_start_offset();
        while offset >= geometry.lane_width {
            item.barrier();
            if col < offset && col + offset < cols {
                value = combine.combine(value, scratch.load(base + offset));
                scratch.store(base, value);
            }
            offset >>= 1;
        }
        width = geometry.lane_width;
    }

    let mut offset = 1;
    while offset < width {
        if let Some(other) = item.shuffle_down(value, offset) {
            value = combine.combine(value, other);
        }
        offset <<= 1;
    }
    value
}
