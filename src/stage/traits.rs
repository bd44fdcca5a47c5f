//! Stage trait definitions.

use crate::data::{PartialSignal, ReducedSignal, ScatteringVector};
use crate::error::ScatterResult;
use std::fmt;

/// Identifier for a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(C)]
pub enum StageId {
    /// Per-subvector amplitude generation.
    Amplitude,
    /// Padding, Fourier transform and reduction.
    Transform,
    /// Folding into the shared accumulator.
    Accumulate,
}

impl StageId {
    /// Get the string name of this stage.
    pub fn name(&self) -> &'static str {
        match self {
            StageId::Amplitude => "amplitude",
            StageId::Transform => "transform",
            StageId::Accumulate => "accumulate",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One unit of stage-1 work: a subvector of the current scattering vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubvectorWorkItem {
    pub id: usize,
    pub q: ScatteringVector,
}

impl SubvectorWorkItem {
    pub fn new(id: usize, q: ScatteringVector) -> Self {
        Self { id, q }
    }

    /// Number the subvectors of one vector in order.
    pub fn batch(subvectors: &[ScatteringVector]) -> Vec<Self> {
        subvectors
            .iter()
            .enumerate()
            .map(|(id, q)| Self::new(id, *q))
            .collect()
    }
}

/// Transformation logic for stages 1 and 2.
///
/// Implementations must be pure with respect to their inputs: the serial and
/// threaded paths call the same methods and must agree on the result.
pub trait ScatterKernel: Send + Sync {
    /// Length of every signal this kernel produces.
    fn frame_count(&self) -> usize;

    /// Stage 1: amplitudes for one subvector.
    fn generate(&self, item: &SubvectorWorkItem) -> ScatterResult<PartialSignal>;

    /// Stage 2: transform a partial signal into its reduced contribution.
    fn transform(&self, partial: PartialSignal) -> ScatterResult<ReducedSignal>;
}
