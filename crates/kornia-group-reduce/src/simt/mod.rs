//! CPU emulation of a SIMT thread block.
//!
//! Provides the pieces a device offers to a kernel: a block of concurrently
//! running threads, a block-wide barrier, shared scratch memory and the
//! lane-group shuffle. The emulation is instrumented so that tests can check
//! how many barrier and shuffle rounds a kernel used.

pub mod barrier;
pub mod item;
pub mod lane_group;
pub mod launch;
pub mod scratch;

pub use barrier::{BarrierPoisoned, RoundBarrier};
pub use item::BlockItem;
pub use lane_group::LaneGroup;
pub use launch::{launch_block, launch_grid, BlockRun, LaunchStats};
pub use scratch::SharedScratch;
