//! Wall-clock accounting for engine phases.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Accumulated time and call count per named phase.
#[derive(Debug, Clone, Default)]
pub struct PhaseTimings {
    phases: BTreeMap<&'static str, (Duration, usize)>,
}

impl PhaseTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time `f` under `phase`.
    pub fn measure<R>(&mut self, phase: &'static str, f: impl FnOnce() -> R) -> R {
        let started = Instant::now();
        let result = f();
        self.record(phase, started.elapsed());
        result
    }

    pub fn record(&mut self, phase: &'static str, elapsed: Duration) {
        let entry = self.phases.entry(phase).or_default();
        entry.0 += elapsed;
        entry.1 += 1;
    }

    pub fn total(&self, phase: &str) -> Duration {
        self.phases.get(phase).map(|e| e.0).unwrap_or_default()
    }

    pub fn count(&self, phase: &str) -> usize {
        self.phases.get(phase).map(|e| e.1).unwrap_or(0)
    }

    pub fn phases(&self) -> impl Iterator<Item = (&'static str, Duration, usize)> + '_ {
        self.phases.iter().map(|(name, (total, count))| (*name, *total, *count))
    }
}
