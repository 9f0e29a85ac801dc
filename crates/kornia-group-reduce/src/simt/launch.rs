//! Block launches on CPU threads.
//!
//! Every thread of a block becomes one scoped OS thread so that block
//! barriers and lane rendezvous behave like they do on a device: all threads
//! are live at the same time and must all arrive. The launch returns once
//! every thread has finished.

use std::any::Any;
use std::thread;

use rayon::prelude::*;

use super::barrier::{BarrierPoisoned, RoundBarrier};
use super::item::BlockItem;
use super::lane_group::LaneGroup;
use super::scratch::SharedScratch;
use crate::error::{ReduceError, Result};
use crate::geometry::BlockGeometry;

/// Synchronization counters of one or more block launches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchStats {
    /// Threads that ran.
    pub threads: usize,
    /// Completed block-wide barrier rounds.
    pub barrier_rounds: usize,
    /// Completed shuffle rounds, summed over every lane group.
    pub shuffle_rounds: usize,
    /// Scratch reads issued during the launch.
    pub scratch_reads: usize,
    /// Scratch writes issued during the launch.
    pub scratch_writes: usize,
}

impl LaunchStats {
    /// Add the counters of another launch.
    pub fn accumulate(&mut self, other: &LaunchStats) {
        self.threads += other.threads;
        self.barrier_rounds += other.barrier_rounds;
        self.shuffle_rounds += other.shuffle_rounds;
        self.scratch_reads += other.scratch_reads;
        self.scratch_writes += other.scratch_writes;
    }
}

/// Output of a block launch: one value per thread in `row * cols + col`
/// order, plus the launch counters.
#[derive(Debug, Clone)]
pub struct BlockRun<R> {
    /// Per-thread kernel return values.
    pub values: Vec<R>,
    /// Launch counters.
    pub stats: LaunchStats,
}

impl<R: Copy> BlockRun<R> {
    /// Value returned by thread `(row, col)`.
    pub fn at(&self, geometry: &BlockGeometry, row: usize, col: usize) -> R {
        self.values[row * geometry.cols + col]
    }

    /// Values returned by column 0 of every row.
    pub fn column0(&self, geometry: &BlockGeometry) -> Vec<R> {
        (0..geometry.rows)
            .map(|row| self.at(geometry, row, 0))
            .collect()
    }
}

struct BlockSync<T> {
    barrier: RoundBarrier,
    // [row][group]
    lane_groups: Vec<Vec<LaneGroup<T>>>,
}

impl<T: Copy> BlockSync<T> {
    fn new(geometry: &BlockGeometry) -> Self {
        let lane_groups = (0..geometry.rows)
            .map(|_| {
                (0..geometry.lane_groups_per_row())
                    .map(|group| LaneGroup::new(geometry.lane_group_len(group)))
                    .collect()
            })
            .collect();
        Self {
            barrier: RoundBarrier::new(geometry.threads()),
            lane_groups,
        }
    }

    fn poison(&self) {
        self.barrier.poison();
        self.lane_groups
            .iter()
            .flatten()
            .for_each(LaneGroup::poison);
    }

    fn shuffle_rounds(&self) -> usize {
        self.lane_groups
            .iter()
            .flatten()
            .map(LaneGroup::shuffles)
            .sum()
    }
}

/// Poisons the whole block when the owning thread unwinds.
struct PoisonOnUnwind<'a, T: Copy>(&'a BlockSync<T>);

impl<T: Copy> Drop for PoisonOnUnwind<'_, T> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.poison();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else if payload.is::<BarrierPoisoned>() {
        "block barrier poisoned".to_string()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Launch one block of `geometry.rows × geometry.cols` threads running
/// `kernel`, and wait for all of them.
///
/// `block` is the block's index in the grid, exposed to the kernel through
/// [`BlockItem::block`]. The scratch buffer must hold at least
/// `rows * cols` elements.
///
/// # Errors
///
/// Returns an error if the geometry is invalid, the scratch buffer is too
/// small, a thread could not be spawned, or any kernel thread panicked.
pub fn launch_block<T, R, K>(
    geometry: &BlockGeometry,
    block: usize,
    scratch: &SharedScratch<T>,
    kernel: K,
) -> Result<BlockRun<R>>
where
    T: Copy + Send,
    R: Send,
    K: Fn(&BlockItem<'_, T>, &SharedScratch<T>) -> R + Sync,
{
    geometry.validate()?;
    if scratch.len() < geometry.scratch_len() {
        return Err(ReduceError::ScratchTooSmall {
            expected: geometry.scratch_len(),
            actual: scratch.len(),
        });
    }

    let sync = BlockSync::<T>::new(geometry);
    let reads_before = scratch.reads();
    let writes_before = scratch.writes();

    let outcome = thread::scope(|s| {
        let mut handles = Vec::with_capacity(geometry.threads());
        for row in 0..geometry.rows {
            for col in 0..geometry.cols {
                let sync = &sync;
                let kernel = &kernel;
                let spawned = thread::Builder::new()
                    .name(format!("block{block}-r{row}c{col}"))
                    .spawn_scoped(s, move || {
                        let _guard = PoisonOnUnwind(sync);
                        let lanes = &sync.lane_groups[row][col / geometry.lane_width];
                        let item =
                            BlockItem::new((row, col), block, *geometry, &sync.barrier, lanes);
                        kernel(&item, scratch)
                    });
                match spawned {
                    Ok(handle) => handles.push(((row, col), handle)),
                    Err(e) => {
                        // Threads already running would wait for the missing ones forever.
                        sync.poison();
                        for (_, handle) in handles {
                            let _ = handle.join();
                        }
                        return Err(ReduceError::KernelLaunchFailed(format!(
                            "could not spawn thread ({row}, {col}): {e}"
                        )));
                    }
                }
            }
        }

        let mut values = Vec::with_capacity(handles.len());
        let mut root_cause: Option<ReduceError> = None;
        let mut cascade: Option<ReduceError> = None;
        for ((row, col), handle) in handles {
            match handle.join() {
                Ok(value) => values.push(value),
                Err(payload) => {
                    let slot = if payload.is::<BarrierPoisoned>() {
                        &mut cascade
                    } else {
                        &mut root_cause
                    };
                    if slot.is_none() {
                        *slot = Some(ReduceError::KernelPanicked {
                            row,
                            col,
                            message: panic_message(payload.as_ref()),
                        });
                    }
                }
            }
        }
        match root_cause.or(cascade) {
            Some(err) => Err(err),
            None => Ok(values),
        }
    });

    let values = match outcome {
        Ok(values) => values,
        Err(err) => {
            log::warn!("block {block} ({}x{}) failed: {err}", geometry.rows, geometry.cols);
            return Err(err);
        }
    };

    let stats = LaunchStats {
        threads: values.len(),
        barrier_rounds: sync.barrier.rounds(),
        shuffle_rounds: sync.shuffle_rounds(),
        scratch_reads: scratch.reads() - reads_before,
        scratch_writes: scratch.writes() - writes_before,
    };
    log::trace!("block {block} finished: {stats:?}");

    Ok(BlockRun { values, stats })
}

/// Launch `blocks` independent blocks of the same geometry, each with its
/// own scratch buffer initialised to `scratch_fill`.
///
/// Blocks run concurrently on the rayon pool; runs are returned in block
/// order. The first failing block's error is returned.
pub fn launch_grid<T, R, K>(
    geometry: &BlockGeometry,
    blocks: usize,
    scratch_fill: T,
    kernel: K,
) -> Result<Vec<BlockRun<R>>>
where
    T: Copy + Send + Sync,
    R: Send,
    K: Fn(&BlockItem<'_, T>, &SharedScratch<T>) -> R + Sync,
{
    geometry.validate()?;
    (0..blocks)
        .into_par_iter()
        .map(|block| {
            let scratch = SharedScratch::new(geometry.scratch_len(), scratch_fill);
            launch_block(geometry, block, &scratch, &kernel)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_and_order() {
        let geometry = BlockGeometry::new(3, 4).with_lane_width(2);
        let scratch = SharedScratch::<u8>::zeroed(geometry.scratch_len());
        let run = launch_block(&geometry, 7, &scratch, |item, _| {
            (item.block(), item.row(), item.col(), item.lane(), item.linear_id())
        })
        .unwrap();

        assert_eq!(run.values.len(), 12);
        assert_eq!(run.values[0], (7, 0, 0, 0, 0));
        assert_eq!(run.values[5], (7, 1, 1, 1, 5));
        assert_eq!(run.values[11], (7, 2, 3, 1, 11));
        assert_eq!(run.stats.threads, 12);
        assert_eq!(run.stats.barrier_rounds, 0);
        assert!(scratch.is_untouched());
    }

    #[test]
    fn test_barrier_rounds_are_counted() {
        let geometry = BlockGeometry::new(2, 3);
        let scratch = SharedScratch::<u8>::zeroed(geometry.scratch_len());
        let run = launch_block(&geometry, 0, &scratch, |item, _| {
            item.barrier();
            item.barrier();
        })
        .unwrap();
        assert_eq!(run.stats.barrier_rounds, 2);
    }

    #[test]
    fn test_scratch_is_visible_after_barrier() {
        let geometry = BlockGeometry::new(1, 8);
        let scratch = SharedScratch::<usize>::zeroed(geometry.scratch_len());
        let run = launch_block(&geometry, 0, &scratch, |item, scratch| {
            scratch.store(item.linear_id(), item.col() * 2);
            item.barrier();
            scratch.load((item.linear_id() + 1) % 8)
        })
        .unwrap();
        assert_eq!(run.values, vec![2, 4, 6, 8, 10, 12, 14, 0]);
        assert_eq!(run.stats.scratch_writes, 8);
        assert_eq!(run.stats.scratch_reads, 8);
    }

    #[test]
    fn test_scratch_too_small() {
        let geometry = BlockGeometry::new(2, 8);
        let scratch = SharedScratch::<u8>::zeroed(10);
        let err = launch_block(&geometry, 0, &scratch, |_, _| ()).unwrap_err();
        assert!(matches!(
            err,
            ReduceError::ScratchTooSmall {
                expected: 16,
                actual: 10
            }
        ));
    }

    #[test]
    fn test_grid_runs_every_block() {
        let geometry = BlockGeometry::new(2, 2);
        let runs = launch_grid(&geometry, 5, 0u8, |item, _| item.block()).unwrap();
        assert_eq!(runs.len(), 5);
        for (block, run) in runs.iter().enumerate() {
            assert!(run.values.iter().all(|&b| b == block));
        }
    }

    #[test]
    fn test_panicking_thread_does_not_deadlock() {
        let geometry = BlockGeometry::new(2, 4);
        let scratch = SharedScratch::<u8>::zeroed(geometry.scratch_len());
        let err = launch_block(&geometry, 0, &scratch, |item, _| {
            if item.row() == 1 && item.col() == 2 {
                panic!("combine exploded");
            }
            item.barrier();
        })
        .unwrap_err();
        match err {
            ReduceError::KernelPanicked { row, col, message } => {
                assert_eq!((row, col), (1, 2));
                assert_eq!(message, "combine exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
