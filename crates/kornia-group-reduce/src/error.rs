//! Error types for group reduction launches.

use thiserror::Error;

/// Result type for group reduction operations.
pub type Result<T> = std::result::Result<T, ReduceError>;

/// Error types that can occur while preparing or launching a reduction.
///
/// The reduction itself is total; every variant here is raised by the host
/// side before or after a launch, never from inside the per-thread algorithm.
#[derive(Error, Debug)]
pub enum ReduceError {
    /// Block geometry cannot be launched (zero extent, lane width not a power of two, ...).
    #[error("Invalid block geometry: {0}")]
    InvalidGeometry(String),

    /// Shared scratch buffer smaller than `rows * cols`.
    #[error("Scratch buffer too small: expected at least {expected}, got {actual}")]
    ScratchTooSmall {
        /// Minimum number of elements
        expected: usize,
        /// Actual number of elements
        actual: usize,
    },

    /// Invalid buffer size or dimensions.
    #[error("Invalid buffer size: expected {expected}, got {actual}")]
    InvalidBufferSize {
        /// Expected buffer size
        expected: usize,
        /// Actual buffer size
        actual: usize,
    },

    /// A segment does not fit in one row of the block.
    #[error("Problem size {problem_size} does not fit in a row of {cols} threads")]
    ProblemTooWide {
        /// Number of values per segment
        problem_size: usize,
        /// Row width of the block
        cols: usize,
    },

    /// A thread of the block panicked; the whole launch is discarded.
    #[error("Kernel thread ({row}, {col}) panicked: {message}")]
    KernelPanicked {
        /// Row of the first failing thread
        row: usize,
        /// Column of the first failing thread
        col: usize,
        /// Panic payload, if it was a string
        message: String,
    },

    /// Kernel launch failed.
    #[error("Kernel launch failed: {0}")]
    KernelLaunchFailed(String),

    /// GPU device not available or not found.
    #[error("GPU device not available: {0}")]
    DeviceNotAvailable(String),

    /// Memory transfer failed (host ↔ device).
    #[error("Memory transfer failed: {0}")]
    MemoryTransferFailed(String),
}
