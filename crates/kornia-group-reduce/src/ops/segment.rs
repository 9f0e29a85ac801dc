//! Segment reduction on the CPU block emulation.
//!
//! Input is laid out segment-major: segment `s` owns
//! `input[s * problem_size..(s + 1) * problem_size]`. Each block row reduces
//! one segment; positions past `problem_size` are padded with the combine
//! operator's identity, and column 0 writes the row's result.

use std::sync::OnceLock;

use crate::combine::Combine;
use crate::error::{ReduceError, Result};
use crate::geometry::BlockGeometry;
use crate::reduce::group_reduce;
use crate::simt::{launch_grid, LaunchStats};

/// Result of a segment reduction together with its launch counters.
#[derive(Debug, Clone)]
pub struct SegmentReduction<T> {
    /// One reduced value per segment.
    pub values: Vec<T>,
    /// Number of blocks launched.
    pub blocks: usize,
    /// Counters summed over every block.
    pub stats: LaunchStats,
}

fn check_layout(input_len: usize, problem_size: usize) -> Result<usize> {
    if problem_size == 0 {
        return Err(ReduceError::InvalidGeometry(
            "problem size must be positive".to_string(),
        ));
    }
    if input_len % problem_size != 0 {
        return Err(ReduceError::InvalidBufferSize {
            expected: input_len.div_ceil(problem_size) * problem_size,
            actual: input_len,
        });
    }
    Ok(input_len / problem_size)
}

/// Reduce every segment of `input` with `combine`.
///
/// # Arguments
///
/// * `input` - Segment-major input, `nsegments * problem_size` values
/// * `problem_size` - Number of values per segment
/// * `geometry` - Block shape; `cols` must be at least `problem_size`
/// * `combine` - Associative operator and its identity
///
/// # Example
///
/// ```
/// use kornia_group_reduce::{segment_reduce, BlockGeometry, LogicalAnd};
///
/// let input = [true, true, false, true, true, true];
/// let out = segment_reduce(&input, 3, &BlockGeometry::new(2, 32), &LogicalAnd)?;
/// assert_eq!(out, vec![false, true]);
/// # Ok::<(), kornia_group_reduce::ReduceError>(())
/// ```
pub fn segment_reduce<T, C>(
    input: &[T],
    problem_size: usize,
    geometry: &BlockGeometry,
    combine: &C,
) -> Result<Vec<T>>
where
    T: Copy + Send + Sync,
    C: Combine<T>,
{
    segment_reduce_with_stats(input, problem_size, geometry, combine).map(|r| r.values)
}

/// Same as [`segment_reduce`], also returning the launch counters.
pub fn segment_reduce_with_stats<T, C>(
    input: &[T],
    problem_size: usize,
    geometry: &BlockGeometry,
    combine: &C,
) -> Result<SegmentReduction<T>>
where
    T: Copy + Send + Sync,
    C: Combine<T>,
{
    geometry.validate()?;
    let nsegments = check_layout(input.len(), problem_size)?;
    if problem_size > geometry.cols {
        return Err(ReduceError::ProblemTooWide {
            problem_size,
            cols: geometry.cols,
        });
    }

    let blocks = nsegments.div_ceil(geometry.rows);
    log::debug!(
        "segment_reduce: {nsegments} segments of {problem_size}, {blocks} blocks of {}x{} (lane width {})",
        geometry.rows,
        geometry.cols,
        geometry.lane_width
    );

    let identity = combine.identity();
    let output: Vec<OnceLock<T>> = (0..nsegments).map(|_| OnceLock::new()).collect();

    let runs = launch_grid(geometry, blocks, identity, |item, scratch| {
        let segment = item.block() * geometry.rows + item.row();
        let position = item.col();
        let value = if segment < nsegments && position < problem_size {
            input[segment * problem_size + position]
        } else {
            identity
        };

        let reduced = group_reduce(item, scratch, value, combine);

        if position == 0 && segment < nsegments {
            let _ = output[segment].set(reduced);
        }
    })?;

    let mut stats = LaunchStats::default();
    for run in &runs {
        stats.accumulate(&run.stats);
    }
    log::debug!("segment_reduce finished: {stats:?}");

    let values = output
        .into_iter()
        .enumerate()
        .map(|(segment, slot)| {
            slot.into_inner().ok_or_else(|| {
                ReduceError::KernelLaunchFailed(format!("segment {segment} produced no value"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SegmentReduction {
        values,
        blocks,
        stats,
    })
}

/// Sequential per-segment reduction, used as the reference result.
pub fn segment_reduce_reference<T, C>(input: &[T], problem_size: usize, combine: &C) -> Result<Vec<T>>
where
    T: Copy,
    C: Combine<T>,
{
    check_layout(input.len(), problem_size)?;
    Ok(input
        .chunks_exact(problem_size)
        .map(|segment| {
            segment
                .iter()
                .fold(combine.identity(), |acc, &v| combine.combine(acc, v))
        })
        .collect())
}
