//! Per-thread view of a running block.

use super::barrier::RoundBarrier;
use super::lane_group::LaneGroup;
use crate::geometry::BlockGeometry;

/// What a kernel thread knows about itself and the block it runs in.
///
/// Mirrors the `nd_item` / `UNIT_POS` family of GPU builtins: a stable
/// `(row, col)` position, the launch geometry, the block barrier and the
/// thread's lane group.
#[derive(Debug)]
pub struct BlockItem<'a, T> {
    row: usize,
    col: usize,
    block: usize,
    geometry: BlockGeometry,
    barrier: &'a RoundBarrier,
    lanes: &'a LaneGroup<T>,
}

impl<'a, T: Copy> BlockItem<'a, T> {
    pub(crate) fn new(
        (row, col): (usize, usize),
        block: usize,
        geometry: BlockGeometry,
        barrier: &'a RoundBarrier,
        lanes: &'a LaneGroup<T>,
    ) -> Self {
        Self {
            row,
            col,
            block,
            geometry,
            barrier,
            lanes,
        }
    }

    /// Row inside the block.
    #[inline]
    pub fn row(&self) -> usize {
        self.row
    }

    /// Column inside the block (the reduction axis).
    #[inline]
    pub fn col(&self) -> usize {
        self.col
    }

    /// Index of this block inside the grid.
    #[inline]
    pub fn block(&self) -> usize {
        self.block
    }

    /// Launch geometry.
    #[inline]
    pub fn geometry(&self) -> &BlockGeometry {
        &self.geometry
    }

    /// Index of this thread in its lane group.
    #[inline]
    pub fn lane(&self) -> usize {
        self.col % self.geometry.lane_width
    }

    /// Linear position in the block, `row * cols + col`.
    #[inline]
    pub fn linear_id(&self) -> usize {
        self.row * self.geometry.cols + self.col
    }

    /// Block-wide barrier. Every thread of the block must reach it.
    #[inline]
    pub fn barrier(&self) {
        self.barrier.wait();
    }

    /// Value of lane `lane() + delta` in this thread's lane group, `None`
    /// past the end of the group.
    #[inline]
    pub fn shuffle_down(&self, value: T, delta: usize) -> Option<T> {
        self.lanes.shuffle_down(self.lane(), value, delta)
    }
}
