//! Error types for the scattering runtime.

use crate::data::SampleError;
use crate::stage::StageId;

/// Result alias used across the crate.
pub type ScatterResult<T> = Result<T, ScatterError>;

/// Errors raised while building or running a scattering computation.
///
/// The type is `Clone` so a single worker failure can be handed to every
/// thread blocked on a drain latch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScatterError {
    /// The configured signal buffer budget cannot hold the per-vector signals.
    #[error(
        "insufficient buffer size for scattering (limits.signal_memory): requested {requested} bytes, available {available} bytes"
    )]
    InsufficientSignalMemory { requested: usize, available: usize },

    #[error("unknown atom selection '{0}'")]
    UnknownSelection(String),

    #[error(transparent)]
    Sample(#[from] SampleError),

    /// Coordinate staging failed; the run never allocates its accumulator.
    #[error("staging failed: {0}")]
    Staging(String),

    #[error("device has not staged its coordinate data")]
    NotStaged,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("signal length mismatch: expected {expected} samples, got {actual}")]
    SignalLength { expected: usize, actual: usize },

    #[error("{stage} worker failed: {message}")]
    Worker { stage: StageId, message: String },

    #[error("{stage} worker panicked")]
    WorkerPanicked { stage: StageId },

    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),

    #[error("worker pool misuse: {0}")]
    PoolState(&'static str),

    #[error("writer: {0}")]
    Writer(String),

    #[error("monitor: {0}")]
    Monitor(String),

    #[error("configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ScatterError {
    fn from(err: serde_json::Error) -> Self {
        ScatterError::Config(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ScatterError {
    fn from(err: ndarray::ShapeError) -> Self {
        ScatterError::Staging(err.to_string())
    }
}
