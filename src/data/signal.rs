//! Complex signal buffers passed between and produced by the pipeline stages.

use crate::error::{ScatterError, ScatterResult};
use num_complex::Complex64;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Peak signal memory for one vector: padded signal (2 * NF) plus the
/// integrated signal (NF).
pub fn signal_memory_estimate(frame_count: usize) -> usize {
    3 * frame_count * std::mem::size_of::<Complex64>()
}

/// Per-frame amplitudes for one subvector, produced by stage 1.
#[derive(Debug, PartialEq)]
pub struct PartialSignal {
    /// Id of the work item that produced this signal.
    pub origin: usize,
    pub data: Vec<Complex64>,
}

impl PartialSignal {
    pub fn new(origin: usize, data: Vec<Complex64>) -> Self {
        Self { origin, data }
    }
}

/// Stage-2 output, ready to be folded into the accumulator.
#[derive(Debug, PartialEq)]
pub struct ReducedSignal {
    pub origin: usize,
    pub data: Vec<Complex64>,
}

impl ReducedSignal {
    pub fn new(origin: usize, data: Vec<Complex64>) -> Self {
        Self { origin, data }
    }
}

/// Running signal for the vector currently being computed.
///
/// One instance lives for the whole run. Every mutation goes through the
/// internal lock so concurrent stage-3 workers never interleave.
#[derive(Debug)]
pub struct SharedAccumulator {
    signal: Mutex<Vec<Complex64>>,
}

impl SharedAccumulator {
    /// Allocate a zeroed accumulator of `frame_count` samples.
    pub fn new(frame_count: usize) -> Self {
        Self {
            signal: Mutex::new(vec![Complex64::new(0.0, 0.0); frame_count]),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Complex64>> {
        self.signal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Zero every sample.
    pub fn reset(&self) {
        self.lock().fill(Complex64::new(0.0, 0.0));
    }

    /// Add a reduced signal element-wise.
    pub fn accumulate(&self, contribution: &ReducedSignal) -> ScatterResult<()> {
        let mut signal = self.lock();
        if contribution.data.len() != signal.len() {
            return Err(ScatterError::SignalLength {
                expected: signal.len(),
                actual: contribution.data.len(),
            });
        }
        for (acc, value) in signal.iter_mut().zip(&contribution.data) {
            *acc += *value;
        }
        Ok(())
    }

    /// Multiply every sample by `factor`.
    pub fn scale(&self, factor: f64) {
        for value in self.lock().iter_mut() {
            *value *= factor;
        }
    }

    /// Run `f` with read access to the signal.
    pub fn with_signal<R>(&self, f: impl FnOnce(&[Complex64]) -> R) -> R {
        f(&self.lock())
    }

    /// Run `f` with write access to the signal.
    pub fn with_signal_mut<R>(&self, f: impl FnOnce(&mut [Complex64]) -> R) -> R {
        f(&mut self.lock())
    }

    /// Copy of the current signal.
    pub fn snapshot(&self) -> Vec<Complex64> {
        self.lock().clone()
    }
}
