//! Segment reduction on GPU.

use crate::error::{ReduceError, Result};
use crate::geometry::BlockGeometry;
use crate::kernels::group_reduce::{segment_reduce_kernel, DeviceCombine};
use crate::memory::{allocate, to_cpu};
use crate::runtime::{GpuBuffer, RuntimeContext};
use cubecl::prelude::*;

/// Reduce every segment of a device buffer with `Op`.
///
/// The input buffer holds `nsegments * problem_size` values in
/// segment-major order. Each cube runs `geometry.rows` segments; its row
/// width is `problem_size` rounded up to a power of two and to at least
/// `geometry.lane_width` and the device's plane width, and the padding is
/// filled with `Op::identity()`. Rows are dropped from the cube until it fits
/// the device's unit and shared-memory limits.
///
/// # Errors
///
/// Returns [`ReduceError::InvalidGeometry`] if a single row of the padded
/// problem is wider than the device allows, and a layout error if the
/// buffer is not a whole number of segments.
///
/// # Example
///
/// ```ignore
/// let input = to_device(&[0u32, 1, 1, 0, 0, 1, 1, 1], vec![2, 4], &runtime)?;
/// let mins = segment_reduce_execute::<_, u32, MinOp>(&input, 4, &BlockGeometry::default(), &runtime)?;
/// assert_eq!(mins, vec![0, 1]);
/// ```
pub fn segment_reduce_execute<R, N, Op>(
    input: &GpuBuffer<R>,
    problem_size: usize,
    geometry: &BlockGeometry,
    runtime: &RuntimeContext<R>,
) -> Result<Vec<N>>
where
    R: Runtime,
    N: Numeric + CubeElement + bytemuck::Pod,
    Op: DeviceCombine<N>,
{
    geometry.validate()?;
    if problem_size == 0 {
        return Err(ReduceError::InvalidGeometry(
            "problem size must be positive".to_string(),
        ));
    }
    let len = input.len();
    if len % problem_size != 0 {
        return Err(ReduceError::InvalidBufferSize {
            expected: len.div_ceil(problem_size) * problem_size,
            actual: len,
        });
    }
    let nsegments = len / problem_size;
    if nsegments == 0 {
        return Ok(Vec::new());
    }

    let limits = runtime.limits();
    // Rows must start on a plane boundary so a plane never spans two segments.
    let lane_width = geometry.lane_width.max(limits.plane_size);
    let max_threads = limits
        .max_units_per_cube
        .min(limits.max_shared_memory_size / std::mem::size_of::<N>());
    let launch = BlockGeometry::for_problem(geometry.rows, problem_size, lane_width)
        .fit_within(max_threads, limits.max_rows)?;
    if launch.rows < geometry.rows {
        log::debug!(
            "segment_reduce_execute: {} rows of {} do not fit {limits:?}, using {}",
            geometry.rows,
            launch.cols,
            launch.rows
        );
    }
    let blocks = nsegments.div_ceil(launch.rows);
    let scratch_len = launch.scratch_len() as u32;
    log::debug!(
        "segment_reduce_execute on {}: {nsegments} segments, {blocks} cubes of {}x{}",
        runtime.backend_name(),
        launch.rows,
        launch.cols
    );

    let cube_count = CubeCount::Static(blocks as u32, 1, 1);
    let cube_dim = CubeDim::new(launch.cols as u32, launch.rows as u32, 1);

    let output = allocate::<_, N>(vec![nsegments], runtime)?;

    unsafe {
        segment_reduce_kernel::launch_unchecked::<N, Op, R>(
            runtime.client(),
            cube_count,
            cube_dim,
            ArrayArg::from_raw_parts(input.handle(), len, 1),
            ArrayArg::from_raw_parts(output.handle(), nsegments, 1),
            ScalarArg::new(problem_size as u32),
            ScalarArg::new(nsegments as u32),
            ScalarArg::new(Op::identity()),
            scratch_len,
        );
    }

    to_cpu(&output, runtime)
}
