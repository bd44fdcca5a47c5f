//! The scatter computation engine: owns the vector sequence and drives the
//! stage / compute / write / advance loop.

use super::comm::Communicator;
use super::config::{Limits, ScatterConfig};
use super::device::{create_device, ScatterDevice};
use super::pool::PoolStats;
use super::timer::PhaseTimings;
use crate::data::{signal_memory_estimate, Sample, ScatteringVector, SharedAccumulator};
use crate::error::{ScatterError, ScatterResult};
use crate::service::{ProgressMonitor, ResultWriter};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span};

/// Loop state reported by [`ScatterEngine::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    MoreWork,
    Done,
}

/// Fail when the signal buffers for `frame_count` frames exceed `limits`.
pub fn check_signal_budget(frame_count: usize, limits: &Limits) -> ScatterResult<()> {
    let requested = signal_memory_estimate(frame_count);
    if requested > limits.signal_memory {
        return Err(ScatterError::InsufficientSignalMemory {
            requested,
            available: limits.signal_memory,
        });
    }
    Ok(())
}

pub struct ScatterEngine {
    all_comm: Arc<dyn Communicator>,
    partition_comm: Arc<dyn Communicator>,
    vectors: Vec<ScatteringVector>,
    current_vector: usize,
    threads_on: bool,
    device: Box<dyn ScatterDevice>,
    writer: Box<dyn ResultWriter>,
    monitor: Box<dyn ProgressMonitor>,
    accumulator: Option<Arc<SharedAccumulator>>,
    timings: PhaseTimings,
    pool_stats: Option<PoolStats>,
    ran: bool,
}

impl ScatterEngine {
    /// Build the engine and its device for `config`.
    ///
    /// The target selection's atoms are split over the partition
    /// communicator, whose members sum their amplitudes before the
    /// transform. Fails before any signal buffer is allocated when the
    /// configured budget is too small for the sample's frame count.
    pub fn new(
        all_comm: Arc<dyn Communicator>,
        partition_comm: Arc<dyn Communicator>,
        sample: Arc<Sample>,
        vectors: Vec<ScatteringVector>,
        config: &ScatterConfig,
        writer: Box<dyn ResultWriter>,
        monitor: Box<dyn ProgressMonitor>,
    ) -> ScatterResult<Self> {
        config.validate()?;
        let device = create_device(config, sample, partition_comm.clone())?;

        Self::with_device(
            all_comm,
            partition_comm,
            vectors,
            &config.limits,
            device,
            writer,
            monitor,
        )
    }

    /// Build the engine around an already constructed device.
    pub fn with_device(
        all_comm: Arc<dyn Communicator>,
        partition_comm: Arc<dyn Communicator>,
        vectors: Vec<ScatteringVector>,
        limits: &Limits,
        device: Box<dyn ScatterDevice>,
        writer: Box<dyn ResultWriter>,
        monitor: Box<dyn ProgressMonitor>,
    ) -> ScatterResult<Self> {
        if let Err(err) = check_signal_budget(device.frame_count(), limits) {
            if all_comm.rank() == 0 {
                error!(
                    requested = signal_memory_estimate(device.frame_count()),
                    available = limits.signal_memory,
                    "signal memory budget too small, raise limits.signal_memory"
                );
            }
            return Err(err);
        }

        debug!(
            vectors = vectors.len(),
            frames = device.frame_count(),
            atoms = device.atom_count(),
            partition_size = partition_comm.size(),
            partition_rank = partition_comm.rank(),
            "engine created"
        );

        Ok(Self {
            all_comm,
            partition_comm,
            vectors,
            current_vector: 0,
            threads_on: limits.threads.on,
            device,
            writer,
            monitor,
            accumulator: None,
            timings: PhaseTimings::new(),
            pool_stats: None,
            ran: false,
        })
    }

    /// Stage data, compute and write every vector, then flush the writer
    /// and report completion. May only be called once.
    pub fn run(&mut self) -> ScatterResult<()> {
        if self.ran {
            return Err(ScatterError::InvalidArgument("engine has already run".into()));
        }
        self.ran = true;
        let rank = self.all_comm.rank();

        {
            let _span = info_span!("stage", rank).entered();
            let device = &mut self.device;
            let report = self.timings.measure("stage", || device.stage_data())?;
            if rank == 0 {
                info!(
                    background = report.background,
                    scattering_length = report.scattering_length,
                    atoms = report.atoms,
                    bytes = report.bytes,
                    "background scattering length"
                );
            }
        }

        let accumulator = Arc::new(SharedAccumulator::new(self.device.frame_count()));
        self.accumulator = Some(accumulator.clone());

        {
            let _span = info_span!("runner", rank, threads = self.threads_on).entered();
            info!(vectors = self.vectors.len(), "runner started");
            let started = Instant::now();
            let outcome = self.runner(&accumulator);
            self.timings.record("runner", started.elapsed());
            outcome?;
        }

        self.writer.flush()?;
        self.monitor.update(rank, 1.0)?;
        info!(rank, "run finished");
        Ok(())
    }

    fn runner(&mut self, accumulator: &Arc<SharedAccumulator>) -> ScatterResult<()> {
        if !self.threads_on {
            return self.vector_loop(accumulator);
        }

        self.device.start_workers(accumulator.clone())?;
        let looped = self.vector_loop(accumulator);
        let stopped = self.device.stop_workers();
        looped?;
        self.pool_stats = Some(stopped?);
        Ok(())
    }

    fn vector_loop(&mut self, accumulator: &SharedAccumulator) -> ScatterResult<()> {
        while self.status() == EngineStatus::MoreWork {
            let index = self.current_vector;
            let vector = self.vectors[index];
            accumulator.reset();

            {
                let _span = info_span!("compute", index).entered();
                let started = Instant::now();
                if self.threads_on {
                    self.device.compute_threaded(&vector, accumulator)?;
                } else {
                    self.device.compute_serial(&vector, accumulator)?;
                }
                self.timings.record("compute", started.elapsed());
            }

            {
                let _span = info_span!("write", index).entered();
                let started = Instant::now();
                self.write(&vector, accumulator)?;
                self.timings.record("write", started.elapsed());
            }

            self.next();
            debug!(index, progress = self.progress(), "vector done");
        }
        Ok(())
    }

    /// Emit the current vector's signal. Only partition rank 0 writes.
    fn write(&mut self, vector: &ScatteringVector, accumulator: &SharedAccumulator) -> ScatterResult<()> {
        if self.partition_comm.rank() != 0 {
            return Ok(());
        }
        let frame_count = self.device.frame_count();
        let writer = &mut self.writer;
        accumulator.with_signal(|signal| writer.write(vector, signal, frame_count))
    }

    /// Advance to the next vector; no-op at the end.
    pub fn next(&mut self) {
        if self.current_vector < self.vectors.len() {
            self.current_vector += 1;
        }
    }

    /// Fraction of vectors done. An empty sequence counts as complete.
    pub fn progress(&self) -> f64 {
        if self.vectors.is_empty() {
            return 1.0;
        }
        self.current_vector as f64 / self.vectors.len() as f64
    }

    pub fn status(&self) -> EngineStatus {
        if self.current_vector < self.vectors.len() {
            EngineStatus::MoreWork
        } else {
            EngineStatus::Done
        }
    }

    pub fn current_vector(&self) -> usize {
        self.current_vector
    }

    pub fn vector_count(&self) -> usize {
        self.vectors.len()
    }

    pub fn frame_count(&self) -> usize {
        self.device.frame_count()
    }

    pub fn atom_count(&self) -> usize {
        self.device.atom_count()
    }

    pub fn timings(&self) -> &PhaseTimings {
        &self.timings
    }

    /// Counts from the worker pool of a finished threaded run.
    pub fn pool_stats(&self) -> Option<PoolStats> {
        self.pool_stats
    }

    /// The accumulator, once `run` has allocated it.
    pub fn accumulator(&self) -> Option<&SharedAccumulator> {
        self.accumulator.as_deref()
    }
}
