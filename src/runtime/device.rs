//! Scatter devices: computation strategies driven by the engine.

use super::assignment::Assignment;
use super::comm::Communicator;
use super::config::{DeviceKind, ScatterConfig, ScatteringParams, ThreadLimits};
use super::pool::{PoolStats, WorkerPool};
use super::serial::compute_serial;
use crate::data::{
    CoordinateSet, Sample, ScatterFactors, ScatteringVector, SharedAccumulator,
};
use crate::error::{ScatterError, ScatterResult};
use crate::stage::{CoherentKernel, ScatterKernel, SubvectorWorkItem};
use std::sync::Arc;
use tracing::debug;

/// Lifecycle contract every computation strategy implements.
pub trait ScatterDevice: Send {
    fn kind(&self) -> DeviceKind;

    /// Trajectory frames, i.e. the length of every signal.
    fn frame_count(&self) -> usize;

    /// Atoms of the target selection across the whole partition.
    fn atom_count(&self) -> usize;

    /// Load this process's share of the coordinate data.
    fn stage_data(&mut self) -> ScatterResult<StagingReport>;

    fn start_workers(&mut self, accumulator: Arc<SharedAccumulator>) -> ScatterResult<()>;

    fn stop_workers(&mut self) -> ScatterResult<PoolStats>;

    /// Accumulate `vector` on the calling thread.
    fn compute_serial(
        &mut self,
        vector: &ScatteringVector,
        accumulator: &SharedAccumulator,
    ) -> ScatterResult<()>;

    /// Accumulate `vector` through the worker pool. Returns only after the
    /// pool has drained.
    fn compute_threaded(
        &mut self,
        vector: &ScatteringVector,
        accumulator: &SharedAccumulator,
    ) -> ScatterResult<()>;
}

/// What one process loaded during staging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagingReport {
    pub atoms: usize,
    pub frames: usize,
    pub bytes: usize,
    /// Background scattering length subtracted from every staged atom.
    pub background: f64,
    /// Sum of the staged atoms' background-corrected scattering lengths.
    pub scattering_length: f64,
}

/// Build the device for `config.device`.
pub fn create_device(
    config: &ScatterConfig,
    sample: Arc<Sample>,
    partition: Arc<dyn Communicator>,
) -> ScatterResult<Box<dyn ScatterDevice>> {
    match config.device {
        DeviceKind::AllVectors => Ok(Box::new(AllVectorsDevice::new(
            sample,
            partition,
            config.scattering.clone(),
            config.limits.threads.clone(),
        )?)),
    }
}

/// Every subvector of a scattering vector becomes one pipeline work item;
/// the accumulated signal is averaged over the subvectors.
///
/// Target atoms are split across the partition; amplitudes are summed
/// across members before the transform, so every member accumulates the
/// partition-wide signal.
pub struct AllVectorsDevice {
    sample: Arc<Sample>,
    partition: Arc<dyn Communicator>,
    /// Target selection atoms assigned to this process.
    atoms: Vec<usize>,
    target_atoms: usize,
    params: ScatteringParams,
    threads: ThreadLimits,
    kernel: Option<Arc<CoherentKernel>>,
    pool: Option<WorkerPool>,
}

impl AllVectorsDevice {
    pub fn new(
        sample: Arc<Sample>,
        partition: Arc<dyn Communicator>,
        params: ScatteringParams,
        threads: ThreadLimits,
    ) -> ScatterResult<Self> {
        let selection = sample
            .selection(&params.target)
            .ok_or_else(|| ScatterError::UnknownSelection(params.target.clone()))?;

        let assignment = Assignment::new(partition.size(), partition.rank(), selection.len())?;
        let atoms = selection[assignment.range()].to_vec();
        let target_atoms = selection.len();

        Ok(Self {
            sample,
            partition,
            atoms,
            target_atoms,
            params,
            threads,
            kernel: None,
            pool: None,
        })
    }

    /// Atoms staged by this process.
    pub fn assigned_atoms(&self) -> &[usize] {
        &self.atoms
    }

    pub fn kernel(&self) -> ScatterResult<Arc<CoherentKernel>> {
        self.kernel.clone().ok_or(ScatterError::NotStaged)
    }

    fn work_items(&self, vector: &ScatteringVector) -> ScatterResult<Vec<SubvectorWorkItem>> {
        let subvectors = self.params.averaging.subvectors(vector)?;
        Ok(SubvectorWorkItem::batch(&subvectors))
    }
}

impl ScatterDevice for AllVectorsDevice {
    fn kind(&self) -> DeviceKind {
        DeviceKind::AllVectors
    }

    fn frame_count(&self) -> usize {
        self.sample.frame_count()
    }

    fn atom_count(&self) -> usize {
        self.target_atoms
    }

    fn stage_data(&mut self) -> ScatterResult<StagingReport> {
        let coordinates = CoordinateSet::stage(&self.sample, &self.atoms)?;
        let factors = ScatterFactors::for_atoms(&self.sample, &self.atoms, self.params.background);

        let report = StagingReport {
            atoms: coordinates.atom_count(),
            frames: coordinates.frame_count(),
            bytes: coordinates.byte_size(),
            background: factors.background(),
            scattering_length: factors.total(),
        };
        debug!(
            rank = self.partition.rank(),
            atoms = report.atoms,
            frames = report.frames,
            bytes = report.bytes,
            "coordinates staged"
        );

        let kernel = CoherentKernel::new(coordinates, factors, self.params.processing)?;
        self.kernel = Some(Arc::new(kernel));
        Ok(report)
    }

    fn start_workers(&mut self, accumulator: Arc<SharedAccumulator>) -> ScatterResult<()> {
        if self.pool.is_some() {
            return Err(ScatterError::PoolState("workers already started"));
        }
        let kernel: Arc<dyn ScatterKernel> = self.kernel()?;
        self.pool = Some(WorkerPool::start(
            kernel,
            self.partition.clone(),
            accumulator,
            &self.threads,
        )?);
        Ok(())
    }

    fn stop_workers(&mut self) -> ScatterResult<PoolStats> {
        self.pool
            .take()
            .ok_or(ScatterError::PoolState("workers not started"))?
            .stop()
    }

    fn compute_serial(
        &mut self,
        vector: &ScatteringVector,
        accumulator: &SharedAccumulator,
    ) -> ScatterResult<()> {
        let kernel = self.kernel()?;
        let items = self.work_items(vector)?;
        let count = items.len();

        compute_serial(kernel.as_ref(), self.partition.as_ref(), &items, accumulator)?;
        accumulator.scale(1.0 / count as f64);
        Ok(())
    }

    fn compute_threaded(
        &mut self,
        vector: &ScatteringVector,
        accumulator: &SharedAccumulator,
    ) -> ScatterResult<()> {
        let items = self.work_items(vector)?;
        let count = items.len();
        let pool = self
            .pool
            .as_mut()
            .ok_or(ScatterError::PoolState("workers not started"))?;

        pool.compute(items)?;
        debug!(subvectors = count, "vector drained");
        accumulator.scale(1.0 / count as f64);
        Ok(())
    }
}
