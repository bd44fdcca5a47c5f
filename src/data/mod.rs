//! Data structures for scattering computations.

pub mod coordinates;
pub mod sample;
pub mod signal;
pub mod vector;

pub use coordinates::{CoordinateSet, ScatterFactors};
pub use sample::{Atom, Motion, Sample, SampleError, SYSTEM_SELECTION};
pub use signal::{signal_memory_estimate, PartialSignal, ReducedSignal, SharedAccumulator};
pub use vector::{Averaging, ScatteringVector};
