//! CubeCL client and buffer handles for the segment kernel.

use crate::error::{ReduceError, Result};
use cubecl::prelude::*;
use cubecl::server::Handle;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};

#[cfg(feature = "cuda")]
pub use cubecl_cuda::CudaRuntime;

#[cfg(feature = "wgpu")]
pub use cubecl_wgpu::WgpuRuntime;

/// Launch limits of a device, read from its hardware properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Most units (threads) a single cube may hold.
    pub max_units_per_cube: usize,
    /// Largest `y` extent of a cube, i.e. the most rows per block.
    pub max_rows: usize,
    /// Shared memory available to one cube, in bytes.
    pub max_shared_memory_size: usize,
    /// Widest plane the device may run.
    pub plane_size: usize,
}

/// Compute client bound to one device.
pub struct RuntimeContext<R: Runtime> {
    client: ComputeClient<R::Server, R::Channel>,
    _phantom: PhantomData<R>,
}

impl<R: Runtime> RuntimeContext<R> {
    /// Open a client on `device`.
    ///
    /// # Errors
    ///
    /// Returns [`ReduceError::DeviceNotAvailable`] when the backend cannot
    /// open the device (no driver, no adapter, device index out of range).
    pub fn new(device: R::Device) -> Result<Self> {
        let client = open_guarded(R::name(), || R::client(&device))?;
        log::debug!("opened {} client", R::name());

        Ok(Self {
            client,
            _phantom: PhantomData,
        })
    }

    /// Get a reference to the compute client.
    pub fn client(&self) -> &ComputeClient<R::Server, R::Channel> {
        &self.client
    }

    /// Get the backend name (e.g. "cuda", "wgpu<wgsl>").
    pub fn backend_name(&self) -> &'static str {
        R::name()
    }

    /// Launch limits of the device.
    pub fn limits(&self) -> DeviceLimits {
        let hardware = &self.client.properties().hardware;
        DeviceLimits {
            max_units_per_cube: hardware.max_units_per_cube as usize,
            max_rows: hardware.max_cube_dim.y as usize,
            max_shared_memory_size: hardware.max_shared_memory_size,
            plane_size: (hardware.plane_size_max as usize).max(1),
        }
    }
}

// Backends panic when no device can be opened.
fn open_guarded<T>(backend: &str, open: impl FnOnce() -> T) -> Result<T> {
    catch_unwind(AssertUnwindSafe(open)).map_err(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "client creation panicked".to_string());
        ReduceError::DeviceNotAvailable(format!("{backend}: {reason}"))
    })
}

/// Device buffer with a logical shape.
pub struct GpuBuffer<R: Runtime> {
    handle: Handle,
    shape: Vec<usize>,
    _phantom: PhantomData<R>,
}

impl<R: Runtime> GpuBuffer<R> {
    pub(crate) fn from_handle(handle: Handle, shape: Vec<usize>) -> Self {
        Self {
            handle,
            shape,
            _phantom: PhantomData,
        }
    }

    /// Logical shape, e.g. `[nsegments, problem_size]`.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }
}

/// Open the first CUDA device.
///
/// # Errors
///
/// Returns [`ReduceError::DeviceNotAvailable`] if there is no usable CUDA device.
#[cfg(feature = "cuda")]
pub fn init_cuda_runtime() -> Result<RuntimeContext<CudaRuntime>> {
    RuntimeContext::new(cubecl_cuda::CudaDevice::new(0))
}

/// Open the best available WGPU adapter.
///
/// # Errors
///
/// Returns [`ReduceError::DeviceNotAvailable`] if no adapter can be opened.
#[cfg(feature = "wgpu")]
pub fn init_wgpu_runtime() -> Result<RuntimeContext<WgpuRuntime>> {
    RuntimeContext::new(cubecl_wgpu::WgpuDevice::BestAvailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_open_is_device_not_available() {
        let err = open_guarded("cuda", || -> u8 { panic!("no CUDA driver found") }).unwrap_err();
        assert!(matches!(err, ReduceError::DeviceNotAvailable(_)));
        assert_eq!(
            err.to_string(),
            "GPU device not available: cuda: no CUDA driver found"
        );

        assert_eq!(open_guarded("wgpu", || 7u8).unwrap(), 7);
    }

    #[test]
    #[cfg(feature = "cuda")]
    fn test_cuda_limits() {
        let Ok(runtime) = init_cuda_runtime() else {
            return;
        };
        let limits = runtime.limits();
        assert!(limits.max_units_per_cube >= 32);
        assert!(limits.plane_size.is_power_of_two());
    }

    #[test]
    #[cfg(feature = "wgpu")]
    fn test_wgpu_limits() {
        let Ok(runtime) = init_wgpu_runtime() else {
            return;
        };
        assert!(!runtime.backend_name().is_empty());
        assert!(runtime.limits().max_units_per_cube >= 1);
    }
}
