//! Single-threaded reference path.

use super::comm::Communicator;
use super::pool::stage_failure;
use crate::data::SharedAccumulator;
use crate::error::ScatterResult;
use crate::stage::{ScatterKernel, StageId, SubvectorWorkItem};

/// Run generate, transform and accumulate for each item in turn on the
/// calling thread. Amplitudes are summed across `partition` before the
/// transform.
pub fn compute_serial(
    kernel: &dyn ScatterKernel,
    partition: &dyn Communicator,
    items: &[SubvectorWorkItem],
    accumulator: &SharedAccumulator,
) -> ScatterResult<()> {
    for item in items {
        let mut partial = kernel
            .generate(item)
            .map_err(|e| stage_failure(StageId::Amplitude, e))?;
        partition
            .reduce_amplitudes(&mut partial.data)
            .map_err(|e| stage_failure(StageId::Amplitude, e))?;
        let reduced = kernel
            .transform(partial)
            .map_err(|e| stage_failure(StageId::Transform, e))?;
        accumulator
            .accumulate(&reduced)
            .map_err(|e| stage_failure(StageId::Accumulate, e))?;
    }
    Ok(())
}
