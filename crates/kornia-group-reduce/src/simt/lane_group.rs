//! Lane-group register exchange.
//!
//! On hardware the lanes of a warp/sub-group run in lockstep and a shuffle
//! reads another lane's register directly. Here every lane publishes its
//! value into a slot, meets the rest of the group at a rendezvous, reads its
//! source slot and meets the group again before anyone may overwrite a slot.
//! None of this touches the block barrier or the shared scratch buffer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::barrier::RoundBarrier;

/// The lanes of one lane group of one row.
#[derive(Debug)]
pub struct LaneGroup<T> {
    slots: Vec<Mutex<Option<T>>>,
    lockstep: RoundBarrier,
    shuffles: AtomicUsize,
}

impl<T: Copy> LaneGroup<T> {
    /// Group of `len` lanes.
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| Mutex::new(None)).collect(),
            lockstep: RoundBarrier::new(len),
            shuffles: AtomicUsize::new(0),
        }
    }

    /// Number of lanes.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the group has no lanes.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Value held by lane `lane + delta`, or `None` when that lane is outside
    /// the group. Every lane of the group must call this the same number of
    /// times with the same `delta`.
    pub fn shuffle_down(&self, lane: usize, value: T, delta: usize) -> Option<T> {
        *self.slots[lane]
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(value);
        if self.lockstep.wait() {
            self.shuffles.fetch_add(1, Ordering::Relaxed);
        }

        let other = self.slots.get(lane + delta).and_then(|slot| {
            *slot.lock().unwrap_or_else(PoisonError::into_inner)
        });

        self.lockstep.wait();
        other
    }

    /// Number of completed shuffle rounds.
    pub fn shuffles(&self) -> usize {
        self.shuffles.load(Ordering::Relaxed)
    }

    pub(crate) fn poison(&self) {
        self.lockstep.poison();
    }
}
