//! Long-lived worker pool running the three-stage scatter pipeline.

use super::comm::Communicator;
use super::config::ThreadLimits;
use super::latch::DrainLatch;
use super::queue::StageQueue;
use crate::data::{PartialSignal, ReducedSignal, SharedAccumulator};
use crate::error::{ScatterError, ScatterResult};
use crate::stage::{ScatterKernel, StageId, SubvectorWorkItem};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Item counts observed by the pool over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub enqueued: usize,
    pub generated: usize,
    pub transformed: usize,
    pub accumulated: usize,
}

impl PoolStats {
    /// Every enqueued item made it through all three stages.
    pub fn fully_drained(&self) -> bool {
        self.enqueued == self.generated
            && self.generated == self.transformed
            && self.transformed == self.accumulated
    }
}

#[derive(Debug, Default)]
struct StageCounters {
    generated: AtomicUsize,
    transformed: AtomicUsize,
    accumulated: AtomicUsize,
}

/// State shared by every worker: the two drain latches and the counters.
#[derive(Clone)]
struct PipelineSignals {
    transformed: Arc<DrainLatch>,
    accumulated: Arc<DrainLatch>,
    counters: Arc<StageCounters>,
}

impl PipelineSignals {
    fn fail(&self, err: ScatterError) {
        warn!(error = %err, "pipeline worker failed");
        self.transformed.fail(err.clone());
        self.accumulated.fail(err);
    }
}

/// Fails the latches if the owning worker unwinds, so no waiter hangs.
struct PanicGuard {
    stage: StageId,
    signals: PipelineSignals,
}

impl Drop for PanicGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            self.signals
                .fail(ScatterError::WorkerPanicked { stage: self.stage });
        }
    }
}

/// Attribute an error to the stage it came from.
pub(crate) fn stage_failure(stage: StageId, err: ScatterError) -> ScatterError {
    match err {
        ScatterError::Worker { .. } | ScatterError::WorkerPanicked { .. } => err,
        other => ScatterError::Worker {
            stage,
            message: other.to_string(),
        },
    }
}

/// Fixed set of stage workers, started once per run and reused for every
/// vector.
pub struct WorkerPool {
    work_tx: Option<Sender<SubvectorWorkItem>>,
    /// Per-vector item counts for the exchange worker; present only for
    /// partitions with more than one member.
    rounds_tx: Option<Sender<usize>>,
    signals: PipelineSignals,
    workers: Vec<(StageId, JoinHandle<()>)>,
    enqueued: usize,
}

impl WorkerPool {
    /// Spawn `limits.*_workers` threads per stage. A multi-member
    /// `partition` adds one exchange thread that sums amplitudes across
    /// members in work-item id order between stages 1 and 2.
    pub fn start(
        kernel: Arc<dyn ScatterKernel>,
        partition: Arc<dyn Communicator>,
        accumulator: Arc<SharedAccumulator>,
        limits: &ThreadLimits,
    ) -> ScatterResult<Self> {
        limits.validate()?;
        if accumulator.len() != kernel.frame_count() {
            return Err(ScatterError::SignalLength {
                expected: kernel.frame_count(),
                actual: accumulator.len(),
            });
        }

        let (work_tx, work_rx) = StageQueue::new(limits.queue_capacity).into_parts();
        let (partial_tx, partial_rx) = StageQueue::new(limits.queue_capacity).into_parts();
        let (summed_tx, summed_rx) = StageQueue::new(limits.queue_capacity).into_parts();
        let (reduced_tx, reduced_rx) = StageQueue::new(limits.queue_capacity).into_parts();

        let signals = PipelineSignals {
            transformed: Arc::new(DrainLatch::new()),
            accumulated: Arc::new(DrainLatch::new()),
            counters: Arc::new(StageCounters::default()),
        };

        let exchange = partition.size() > 1;
        let (rounds_tx, rounds_rx) = unbounded();

        let mut pool = Self {
            work_tx: Some(work_tx),
            rounds_tx: exchange.then_some(rounds_tx),
            signals: signals.clone(),
            workers: Vec::with_capacity(limits.total_workers()),
            enqueued: 0,
        };

        for index in 0..limits.amplitude_workers {
            let (kernel, rx, tx, signals) = (
                kernel.clone(),
                work_rx.clone(),
                partial_tx.clone(),
                signals.clone(),
            );
            pool.spawn(StageId::Amplitude, index, move || {
                amplitude_worker(kernel, rx, tx, signals)
            })?;
        }

        // Without an exchange stage the transform workers read the
        // amplitude queue directly.
        let transform_rx = if exchange {
            let signals = signals.clone();
            pool.spawn(StageId::Amplitude, limits.amplitude_workers, move || {
                exchange_worker(partition, rounds_rx, partial_rx, summed_tx, signals)
            })?;
            summed_rx
        } else {
            partial_rx
        };

        for index in 0..limits.transform_workers {
            let (kernel, rx, tx, signals) = (
                kernel.clone(),
                transform_rx.clone(),
                reduced_tx.clone(),
                signals.clone(),
            );
            pool.spawn(StageId::Transform, index, move || {
                transform_worker(kernel, rx, tx, signals)
            })?;
        }

        for index in 0..limits.accumulate_workers {
            let (accumulator, rx, signals) =
                (accumulator.clone(), reduced_rx.clone(), signals.clone());
            pool.spawn(StageId::Accumulate, index, move || {
                accumulate_worker(accumulator, rx, signals)
            })?;
        }

        debug!(workers = pool.workers.len(), "worker pool started");
        Ok(pool)
    }

    fn spawn<F>(&mut self, stage: StageId, index: usize, body: F) -> ScatterResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(format!("scatrs-{}-{}", stage.name(), index))
            .spawn(body)
            .map_err(|e| ScatterError::Spawn(e.to_string()))?;
        self.workers.push((stage, handle));
        Ok(())
    }

    /// Push one vector's work items through the pipeline and block until
    /// every one of them has been folded into the accumulator.
    pub fn compute(&mut self, items: Vec<SubvectorWorkItem>) -> ScatterResult<()> {
        let tx = self
            .work_tx
            .as_ref()
            .ok_or(ScatterError::PoolState("worker pool already stopped"))?;

        // The exchange worker releases items by id, so ids must be 0..n.
        if self.rounds_tx.is_some()
            && items.iter().enumerate().any(|(index, item)| item.id != index)
        {
            return Err(ScatterError::InvalidArgument(
                "partitioned work items must carry ids 0..n in order".into(),
            ));
        }

        let expected = items.len();
        self.signals.transformed.arm(expected);
        self.signals.accumulated.arm(expected);

        if let Some(rounds) = &self.rounds_tx {
            if rounds.send(expected).is_err() {
                self.signals.accumulated.wait()?;
                return Err(ScatterError::PoolState("exchange worker exited"));
            }
        }

        for item in items {
            if tx.send(item).is_err() {
                // Workers only hang up early after a failure has been recorded.
                self.signals.accumulated.wait()?;
                return Err(ScatterError::PoolState("amplitude workers exited"));
            }
            self.enqueued += 1;
        }

        self.signals.transformed.wait()?;
        self.signals.accumulated.wait()
    }

    pub fn stats(&self) -> PoolStats {
        let counters = &self.signals.counters;
        PoolStats {
            enqueued: self.enqueued,
            generated: counters.generated.load(Ordering::SeqCst),
            transformed: counters.transformed.load(Ordering::SeqCst),
            accumulated: counters.accumulated.load(Ordering::SeqCst),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Close the work queue, let the stages drain in cascade and join
    /// every thread.
    pub fn stop(mut self) -> ScatterResult<PoolStats> {
        let outcome = self.shutdown();
        let stats = self.stats();
        debug!(?stats, "worker pool stopped");
        outcome.map(|_| stats)
    }

    fn shutdown(&mut self) -> ScatterResult<()> {
        self.work_tx.take();
        self.rounds_tx.take();

        let mut outcome = Ok(());
        for (stage, handle) in self.workers.drain(..) {
            if handle.join().is_err() && outcome.is_ok() {
                outcome = Err(ScatterError::WorkerPanicked { stage });
            }
        }
        outcome
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            let _ = self.shutdown();
        }
    }
}

fn amplitude_worker(
    kernel: Arc<dyn ScatterKernel>,
    rx: Receiver<SubvectorWorkItem>,
    tx: Sender<PartialSignal>,
    signals: PipelineSignals,
) {
    let _guard = PanicGuard {
        stage: StageId::Amplitude,
        signals: signals.clone(),
    };

    for item in rx.iter() {
        match kernel.generate(&item) {
            Ok(partial) => {
                signals.counters.generated.fetch_add(1, Ordering::SeqCst);
                if tx.send(partial).is_err() {
                    break;
                }
            }
            Err(err) => signals.fail(stage_failure(StageId::Amplitude, err)),
        }
    }
}

/// Releases each round's partials in id order, summed across the partition.
fn exchange_worker(
    partition: Arc<dyn Communicator>,
    rounds: Receiver<usize>,
    rx: Receiver<PartialSignal>,
    tx: Sender<PartialSignal>,
    signals: PipelineSignals,
) {
    let _guard = PanicGuard {
        stage: StageId::Amplitude,
        signals: signals.clone(),
    };

    let mut pending = BTreeMap::new();
    for expected in rounds.iter() {
        for next in 0..expected {
            let mut partial = loop {
                if let Some(partial) = pending.remove(&next) {
                    break partial;
                }
                match rx.recv() {
                    Ok(partial) => {
                        pending.insert(partial.origin, partial);
                    }
                    Err(_) => return,
                }
            };

            if let Err(err) = partition.reduce_amplitudes(&mut partial.data) {
                signals.fail(stage_failure(StageId::Amplitude, err));
                return;
            }
            if tx.send(partial).is_err() {
                return;
            }
        }
    }
}

fn transform_worker(
    kernel: Arc<dyn ScatterKernel>,
    rx: Receiver<PartialSignal>,
    tx: Sender<ReducedSignal>,
    signals: PipelineSignals,
) {
    let _guard = PanicGuard {
        stage: StageId::Transform,
        signals: signals.clone(),
    };

    for partial in rx.iter() {
        match kernel.transform(partial) {
            Ok(reduced) => {
                signals.counters.transformed.fetch_add(1, Ordering::SeqCst);
                if tx.send(reduced).is_err() {
                    break;
                }
                signals.transformed.count_down();
            }
            Err(err) => signals.fail(stage_failure(StageId::Transform, err)),
        }
    }
}

fn accumulate_worker(
    accumulator: Arc<SharedAccumulator>,
    rx: Receiver<ReducedSignal>,
    signals: PipelineSignals,
) {
    let _guard = PanicGuard {
        stage: StageId::Accumulate,
        signals: signals.clone(),
    };

    for reduced in rx.iter() {
        match accumulator.accumulate(&reduced) {
            Ok(()) => {
                signals.counters.accumulated.fetch_add(1, Ordering::SeqCst);
                signals.accumulated.count_down();
            }
            Err(err) => signals.fail(stage_failure(StageId::Accumulate, err)),
        }
    }
}
