//! Memory transfer operations between CPU and GPU.

use crate::error::{ReduceError, Result};
use crate::runtime::{GpuBuffer, RuntimeContext};
use cubecl::prelude::*;

/// Transfer data from CPU to GPU.
///
/// # Arguments
///
/// * `data` - Slice of data to transfer
/// * `shape` - Shape of the buffer, e.g. `[nsegments, problem_size]`
/// * `runtime` - Runtime context with GPU client
///
/// # Example
///
/// ```ignore
/// let input = to_device(&[1u32, 0, 1, 1], vec![2, 2], &runtime)?;
/// ```
pub fn to_device<R: Runtime, T: CubePrimitive + bytemuck::Pod + Copy>(
    data: &[T],
    shape: Vec<usize>,
    runtime: &RuntimeContext<R>,
) -> Result<GpuBuffer<R>> {
    let expected_len: usize = shape.iter().product();
    if data.len() != expected_len {
        return Err(ReduceError::InvalidBufferSize {
            expected: expected_len,
            actual: data.len(),
        });
    }

    let handle = runtime.client().create(bytemuck::cast_slice(data));

    Ok(GpuBuffer::from_handle(handle, shape))
}

/// Transfer data from GPU to CPU.
pub fn to_cpu<R: Runtime, T: CubePrimitive + bytemuck::Pod + Copy>(
    buffer: &GpuBuffer<R>,
    runtime: &RuntimeContext<R>,
) -> Result<Vec<T>> {
    // binding() consumes the handle
    let bytes = runtime.client().read(buffer.handle().clone().binding());

    let data: &[T] = bytemuck::try_cast_slice(&bytes)
        .map_err(|e| ReduceError::MemoryTransferFailed(e.to_string()))?;

    Ok(data.to_vec())
}

/// Allocate an uninitialised GPU buffer with the given shape.
pub fn allocate<R: Runtime, T: CubePrimitive>(
    shape: Vec<usize>,
    runtime: &RuntimeContext<R>,
) -> Result<GpuBuffer<R>> {
    let len: usize = shape.iter().product();
    let handle = runtime.client().empty(len * std::mem::size_of::<T>());

    Ok(GpuBuffer::from_handle(handle, shape))
}
