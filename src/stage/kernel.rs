//! Coherent scattering kernel over staged coordinates.

use super::amplitude::coherent_amplitudes;
use super::traits::{ScatterKernel, SubvectorWorkItem};
use super::transform::{CorrelationTransform, SignalProcessing};
use crate::data::{CoordinateSet, PartialSignal, ReducedSignal, ScatterFactors};
use crate::error::{ScatterError, ScatterResult};

/// Stage 1 and 2 logic for coherent scattering of the staged atoms.
pub struct CoherentKernel {
    coordinates: CoordinateSet,
    factors: ScatterFactors,
    transform: CorrelationTransform,
}

impl CoherentKernel {
    pub fn new(
        coordinates: CoordinateSet,
        factors: ScatterFactors,
        processing: SignalProcessing,
    ) -> ScatterResult<Self> {
        if coordinates.atom_count() != factors.len() {
            return Err(ScatterError::Staging(format!(
                "{} staged atoms but {} scattering factors",
                coordinates.atom_count(),
                factors.len()
            )));
        }
        let transform = CorrelationTransform::new(coordinates.frame_count(), processing);
        Ok(Self {
            coordinates,
            factors,
            transform,
        })
    }
}

impl ScatterKernel for CoherentKernel {
    fn frame_count(&self) -> usize {
        self.coordinates.frame_count()
    }

    fn generate(&self, item: &SubvectorWorkItem) -> ScatterResult<PartialSignal> {
        let data = coherent_amplitudes(&self.coordinates, &self.factors, &item.q);
        Ok(PartialSignal::new(item.id, data))
    }

    fn transform(&self, partial: PartialSignal) -> ScatterResult<ReducedSignal> {
        let data = self.transform.apply(&partial.data)?;
        Ok(ReducedSignal::new(partial.origin, data))
    }
}
