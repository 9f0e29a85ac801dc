//! Execution backends.

/// Where a reduction runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// CPU block emulation, always available.
    Cpu,
    /// CUDA backend (NVIDIA GPUs)
    #[cfg(feature = "cuda")]
    Cuda,
    /// WGPU backend (Vulkan/Metal/DirectX12)
    #[cfg(feature = "wgpu")]
    Wgpu,
}

impl Backend {
    /// Backends compiled into this build, GPU backends first.
    pub fn compiled() -> Vec<Backend> {
        let mut backends = Vec::new();
        #[cfg(feature = "cuda")]
        backends.push(Backend::Cuda);
        #[cfg(feature = "wgpu")]
        backends.push(Backend::Wgpu);
        backends.push(Backend::Cpu);
        backends
    }

    /// Human-readable backend name.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Cpu => "cpu",
            #[cfg(feature = "cuda")]
            Backend::Cuda => "cuda",
            #[cfg(feature = "wgpu")]
            Backend::Wgpu => "wgpu",
        }
    }

    /// Whether the backend runs on a device rather than on CPU threads.
    pub fn is_gpu(&self) -> bool {
        !matches!(self, Backend::Cpu)
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
