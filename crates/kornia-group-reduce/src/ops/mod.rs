//! Host-side entry points.
//!
//! [`segment`] runs the segment kernel on the CPU block emulation; with the
//! `gpu` feature, [`gpu`] launches the same kernel through CubeCL.

pub mod segment;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use segment::{
    segment_reduce, segment_reduce_reference, segment_reduce_with_stats, SegmentReduction,
};

#[cfg(feature = "gpu")]
pub use gpu::segment_reduce_execute;
