//! Block-shared scratch memory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Scratch buffer shared by every thread of a block, addressed by
/// `row * cols + col`.
///
/// Each element sits behind its own lock so that the emulation stays free of
/// `unsafe`; ordering between rounds still comes from the block barrier, not
/// from these locks. Reads and writes are counted so tests can observe
/// whether the shared-memory phase ran.
#[derive(Debug)]
pub struct SharedScratch<T> {
    cells: Vec<Mutex<T>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl<T: Copy> SharedScratch<T> {
    /// Scratch of `len` elements, all set to `fill`.
    pub fn new(len: usize, fill: T) -> Self {
        Self {
            cells: (0..len).map(|_| Mutex::new(fill)).collect(),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Read element `index`.
    #[inline]
    pub fn load(&self, index: usize) -> T {
        self.reads.fetch_add(1, Ordering::Relaxed);
        *self.cells[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Write element `index`.
    #[inline]
    pub fn store(&self, index: usize, value: T) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        *self.cells[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Copy the current contents out, without touching the counters.
    pub fn snapshot(&self) -> Vec<T> {
        self.cells
            .iter()
            .map(|cell| *cell.lock().unwrap_or_else(PoisonError::into_inner))
            .collect()
    }
}

impl<T: Copy + Default> SharedScratch<T> {
    /// Scratch of `len` default-valued elements.
    pub fn zeroed(len: usize) -> Self {
        Self::new(len, T::default())
    }
}

impl<T> SharedScratch<T> {
    /// Number of elements.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the buffer has no elements.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Total reads since creation or the last [`reset_counters`](Self::reset_counters).
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Total writes since creation or the last [`reset_counters`](Self::reset_counters).
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Whether any thread read or wrote the buffer.
    pub fn is_untouched(&self) -> bool {
        self.reads() == 0 && self.writes() == 0
    }

    /// Zero the traffic counters.
    pub fn reset_counters(&self) {
        self.reads.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
    }
}
