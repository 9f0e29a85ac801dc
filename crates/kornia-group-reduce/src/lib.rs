//! Row-wise group reduction over 2D thread blocks.
//!
//! Each row of a `rows × cols` thread block reduces its own segment to a
//! single value with an associative combine operator. Rows wider than one
//! lane group (warp / sub-group / plane) are first folded through shared
//! memory, one barrier per halving; the last lane group finishes with
//! register shuffles and no barrier at all. Rows that already fit in one
//! lane group never touch shared memory.
//!
//! # Features
//!
//! - **CPU block emulation**: every thread is a real OS thread, with a block
//!   barrier, shared scratch memory and lane shuffles. Instrumented, so the
//!   number of barrier rounds and scratch traffic can be checked.
//! - **GPU**: the same kernel written with CubeCL.
//!
//! # Feature Flags
//!
//! - `gpu`: Enable the CubeCL kernels and host helpers
//! - `cuda`: Enable CUDA backend (NVIDIA GPUs)
//! - `wgpu`: Enable WGPU backend (Vulkan/Metal/DX12)
//!
//! # Examples
//!
//! ```rust
//! use kornia_group_reduce::{segment_reduce, BlockGeometry, Min};
//!
//! // 4 segments of 5 booleans, reduced by rows of 32 threads.
//! let input = [
//!     false, true, true, false, false,
//!     true, false, true, false, true,
//!     true, true, true, true, true,
//!     true, true, false, false, false,
//! ];
//! let out = segment_reduce(&input, 5, &BlockGeometry::new(4, 32), &Min::with_identity(true))?;
//! assert_eq!(out, vec![false, false, true, false]);
//! # Ok::<(), kornia_group_reduce::ReduceError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod combine;
pub mod device;
pub mod error;
pub mod geometry;
pub mod ops;
pub mod reduce;
pub mod simt;

#[cfg(feature = "gpu")]
pub mod runtime;

#[cfg(feature = "gpu")]
pub mod memory;

#[cfg(feature = "gpu")]
pub mod kernels;


// Re-exports
pub use combine::{combine_fn, Combine, FnCombine, LogicalAnd, LogicalOr, Max, Min, Sum};
pub use device::Backend;
pub use error::{ReduceError, Result};
pub use geometry::{BlockGeometry, DEFAULT_LANE_WIDTH};
pub use ops::*;
pub use reduce::group_reduce;
pub use simt::{launch_block, launch_grid, BlockItem, BlockRun, LaunchStats, SharedScratch};

#[cfg(feature = "gpu")]
pub use runtime::*;

#[cfg(feature = "gpu")]
pub use memory::*;

#[cfg(feature = "gpu")]
pub use kernels::*;
