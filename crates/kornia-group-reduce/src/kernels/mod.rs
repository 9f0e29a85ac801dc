//! GPU kernel implementations using CubeCL.
//!
//! Each kernel is annotated with `#[cube(launch_unchecked)]` for CubeCL compilation.

// CubeCL's #[cube] macro generates code without docs
#![allow(missing_docs)]

pub mod group_reduce;

pub use group_reduce::*;
