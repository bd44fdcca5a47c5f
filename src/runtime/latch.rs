//! Countdown latch used as the per-vector drain barrier.

use crate::error::{ScatterError, ScatterResult};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct LatchState {
    expected: usize,
    completed: usize,
    failure: Option<ScatterError>,
}

/// Completion counter paired with a condition variable.
///
/// The orchestrator arms it with the number of items it is about to enqueue,
/// workers count down as they finish, and [`DrainLatch::wait`] returns once
/// every item has been counted or a worker has failed.
#[derive(Debug, Default)]
pub struct DrainLatch {
    state: Mutex<LatchState>,
    notifier: Condvar,
}

impl DrainLatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new round expecting `expected` completions.
    ///
    /// A recorded failure is kept: the run it belongs to is already lost.
    pub fn arm(&self, expected: usize) {
        let mut state = self.lock();
        state.expected = expected;
        state.completed = 0;
    }

    pub fn count_down(&self) {
        let mut state = self.lock();
        state.completed += 1;
        if state.completed >= state.expected {
            self.notifier.notify_all();
        }
    }

    /// Record a failure and wake every waiter. Only the first one is kept.
    pub fn fail(&self, err: ScatterError) {
        let mut state = self.lock();
        if state.failure.is_none() {
            state.failure = Some(err);
        }
        self.notifier.notify_all();
    }

    /// Block until the round has drained.
    pub fn wait(&self) -> ScatterResult<()> {
        let state = self
            .notifier
            .wait_while(self.lock(), |s| {
                s.completed < s.expected && s.failure.is_none()
            })
            .unwrap_or_else(PoisonError::into_inner);

        match &state.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    #[cfg(test)]
    pub fn is_drained(&self) -> bool {
        let state = self.lock();
        state.completed >= state.expected
    }

    #[cfg(test)]
    pub fn completed(&self) -> usize {
        self.lock().completed
    }
}
