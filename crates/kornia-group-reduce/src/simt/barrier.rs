//! Poisonable counting barrier.
//!
//! `std::sync::Barrier` blocks forever when one participant never arrives,
//! which is what happens when a kernel thread panics mid-reduction. This
//! barrier can be poisoned: every current and future waiter then panics
//! with [`BarrierPoisoned`] instead of blocking, so the whole block unwinds.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Panic payload raised by waiters of a poisoned barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierPoisoned;

#[derive(Debug, Default)]
struct State {
    arrived: usize,
    generation: usize,
    poisoned: bool,
}

/// Barrier for a fixed number of participants that counts completed rounds.
#[derive(Debug)]
pub struct RoundBarrier {
    parties: usize,
    state: Mutex<State>,
    cvar: Condvar,
}

impl RoundBarrier {
    /// Barrier for `parties` threads.
    pub fn new(parties: usize) -> Self {
        Self {
            parties,
            state: Mutex::new(State::default()),
            cvar: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until all parties arrived. Returns `true` for exactly one
    /// thread per round.
    ///
    /// # Panics
    ///
    /// Panics with [`BarrierPoisoned`] if the barrier is or becomes poisoned.
    pub fn wait(&self) -> bool {
        let mut state = self.lock();
        if state.poisoned {
            drop(state);
            std::panic::panic_any(BarrierPoisoned);
        }

        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation += 1;
            self.cvar.notify_all();
            return true;
        }

        while state.generation == generation && !state.poisoned {
            state = self
                .cvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.generation == generation {
            drop(state);
            std::panic::panic_any(BarrierPoisoned);
        }
        false
    }

    /// Release every waiter with a panic; later calls to `wait` panic too.
    pub fn poison(&self) {
        self.lock().poisoned = true;
        self.cvar.notify_all();
    }

    /// Number of completed rounds.
    pub fn rounds(&self) -> usize {
        self.lock().generation
    }

    /// Number of participants.
    pub fn parties(&self) -> usize {
        self.parties
    }
}
