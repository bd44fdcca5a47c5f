//! Stage logic for the scatter pipeline.
//!
//! Stage 1 ([`amplitude`]) and stage 2 ([`transform`]) are bundled behind the
//! [`ScatterKernel`] trait; stage 3 is [`SharedAccumulator::accumulate`].
//!
//! [`SharedAccumulator::accumulate`]: crate::data::SharedAccumulator::accumulate

pub mod amplitude;
pub mod kernel;
pub mod traits;
pub mod transform;

#[cfg(test)]
pub(crate) mod testing;

pub use kernel::CoherentKernel;
pub use traits::{ScatterKernel, StageId, SubvectorWorkItem};
pub use transform::{CorrelationTransform, SignalProcessing};
