//! Thread-block geometry.
//!
//! A block is a `rows × cols` grid of threads. Each row reduces one segment;
//! `cols` is the reduction axis. Rows are split into lane groups of
//! `lane_width` threads, the unit that can exchange registers without going
//! through shared memory.

use crate::error::{ReduceError, Result};

/// Hardware lane-group width used when none is given (one warp / sub-group).
pub const DEFAULT_LANE_WIDTH: usize = 32;

/// Shape of a thread block and the lane-group width it runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockGeometry {
    /// Number of segments reduced by one block.
    pub rows: usize,
    /// Threads per segment (the reduction axis).
    pub cols: usize,
    /// Lane-group width `W`, a power of two.
    pub lane_width: usize,
}

impl BlockGeometry {
    /// Create a `rows × cols` block using [`DEFAULT_LANE_WIDTH`].
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            lane_width: DEFAULT_LANE_WIDTH,
        }
    }

    /// Geometry for targets without a lane shuffle: a lane width of one
    /// sends the whole reduction through shared memory.
    pub const fn shared_memory_only(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            lane_width: 1,
        }
    }

    /// Smallest block that fits `problem_size` values per segment: the row
    /// width is the problem size rounded up to a power of two, and never
    /// narrower than one lane group.
    pub fn for_problem(rows: usize, problem_size: usize, lane_width: usize) -> Self {
        Self {
            rows,
            cols: problem_size.next_power_of_two().max(lane_width),
            lane_width,
        }
    }

    /// Replace the lane-group width.
    #[must_use]
    pub const fn with_lane_width(mut self, lane_width: usize) -> Self {
        self.lane_width = lane_width;
        self
    }

    /// Total number of threads in the block.
    pub const fn threads(&self) -> usize {
        self.rows * self.cols
    }

    /// Minimum scratch size in elements.
    pub const fn scratch_len(&self) -> usize {
        self.rows * self.cols
    }

    /// Whether the shared-memory phase runs at all.
    pub const fn needs_tree_phase(&self) -> bool {
        self.cols > self.lane_width
    }

    /// First tree offset: half the row width rounded up to a power of two.
    pub fn tree_start_offset(&self) -> usize {
        self.cols.next_power_of_two() / 2
    }

    /// Number of barrier-synchronized tree rounds, `ceil(log2(cols / W))`.
    pub fn tree_rounds(&self) -> usize {
        if !self.needs_tree_phase() {
            return 0;
        }
        let span = self.cols.next_power_of_two() / self.lane_width;
        span.trailing_zeros() as usize
    }

    /// Width reduced by lane shuffles after the tree phase.
    pub fn effective_width(&self) -> usize {
        self.cols.min(self.lane_width)
    }

    /// Number of shuffle rounds, `ceil(log2(effective_width))`.
    pub fn shuffle_rounds(&self) -> usize {
        self.effective_width().next_power_of_two().trailing_zeros() as usize
    }

    /// Lane groups per row; the last one may be narrower than `lane_width`.
    pub fn lane_groups_per_row(&self) -> usize {
        self.cols.div_ceil(self.lane_width)
    }

    /// Number of threads in lane group `group` of a row.
    pub fn lane_group_len(&self, group: usize) -> usize {
        let start = group * self.lane_width;
        self.lane_width.min(self.cols.saturating_sub(start))
    }

    /// Drop rows until the block fits a device that runs at most
    /// `max_threads` threads and `max_rows` rows per block.
    ///
    /// # Errors
    ///
    /// Returns [`ReduceError::InvalidGeometry`] when a single row is already
    /// wider than `max_threads`.
    pub fn fit_within(self, max_threads: usize, max_rows: usize) -> Result<Self> {
        if self.cols > max_threads || max_rows == 0 {
            return Err(ReduceError::InvalidGeometry(format!(
                "a row of {} threads does not fit a block of at most {max_threads} threads and {max_rows} rows",
                self.cols
            )));
        }
        let rows = self.rows.min(max_threads / self.cols).min(max_rows);
        Ok(Self { rows, ..self })
    }

    /// Check the geometry once before a launch.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ReduceError::InvalidGeometry(format!(
                "block must be non-empty, got {}x{}",
                self.rows, self.cols
            )));
        }
        if !self.lane_width.is_power_of_two() {
            return Err(ReduceError::InvalidGeometry(format!(
                "lane width must be a power of two, got {}",
                self.lane_width
            )));
        }
        Ok(())
    }
}

impl Default for BlockGeometry {
    /// The 4×32 block of the boolean segment-minimum reference launch.
    fn default() -> Self {
        Self::new(4, DEFAULT_LANE_WIDTH)
    }
}
