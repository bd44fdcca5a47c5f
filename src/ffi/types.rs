//! C-compatible type definitions for FFI.

use crate::error::ScatterError;
use crate::runtime::EngineStatus;
use num_complex::Complex64;
use std::ffi::c_void;

/// Result status codes for FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScatStatus {
    /// Operation succeeded.
    Ok = 0,
    /// Null pointer was passed.
    NullPointer = 1,
    /// Invalid argument.
    InvalidArgument = 2,
    /// Array length mismatch.
    LengthMismatch = 3,
    /// Invalid UTF-8 string.
    InvalidUtf8 = 4,
    /// Configuration could not be parsed or validated.
    ConfigError = 5,
    /// Signal memory budget too small.
    ResourceLimit = 6,
    /// Coordinate staging failed.
    StagingError = 7,
    /// A pipeline worker failed or panicked.
    WorkerError = 8,
    /// Writer or monitor callback failed.
    ServiceError = 9,
    /// Selection not found.
    NotFound = 10,
}

impl From<&ScatterError> for ScatStatus {
    fn from(err: &ScatterError) -> Self {
        match err {
            ScatterError::InsufficientSignalMemory { .. } => ScatStatus::ResourceLimit,
            ScatterError::UnknownSelection(_) => ScatStatus::NotFound,
            ScatterError::Sample(_) | ScatterError::SignalLength { .. } => {
                ScatStatus::LengthMismatch
            }
            ScatterError::Staging(_) | ScatterError::NotStaged => ScatStatus::StagingError,
            ScatterError::InvalidArgument(_) => ScatStatus::InvalidArgument,
            ScatterError::Worker { .. }
            | ScatterError::WorkerPanicked { .. }
            | ScatterError::Spawn(_)
            | ScatterError::PoolState(_) => ScatStatus::WorkerError,
            ScatterError::Writer(_) | ScatterError::Monitor(_) => ScatStatus::ServiceError,
            ScatterError::Config(_) => ScatStatus::ConfigError,
        }
    }
}

/// Engine loop state.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScatEngineStatus {
    MoreWork = 0,
    Done = 1,
}

impl From<EngineStatus> for ScatEngineStatus {
    fn from(status: EngineStatus) -> Self {
        match status {
            EngineStatus::MoreWork => ScatEngineStatus::MoreWork,
            EngineStatus::Done => ScatEngineStatus::Done,
        }
    }
}

/// C-compatible complex number.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CComplex {
    pub re: f64,
    pub im: f64,
}

impl From<Complex64> for CComplex {
    fn from(v: Complex64) -> Self {
        Self { re: v.re, im: v.im }
    }
}

/// Callback receiving one computed vector.
///
/// # Arguments
/// * `user_data` - User-provided context pointer
/// * `index` - Position of the vector in the input sequence
/// * `q` - Pointer to the 3 vector components
/// * `signal` - Pointer to `frame_count` signal values
/// * `frame_count` - Signal length
///
/// Returning anything but `Ok` aborts the run.
pub type VectorCallback = extern "C" fn(
    user_data: *mut c_void,
    index: usize,
    q: *const f64,
    signal: *const CComplex,
    frame_count: usize,
) -> ScatStatus;

/// Callback for progress updates.
///
/// # Arguments
/// * `user_data` - User-provided context pointer
/// * `rank` - Global rank reporting progress
/// * `fraction` - Completed fraction in [0, 1]
pub type ProgressCallback = extern "C" fn(user_data: *mut c_void, rank: usize, fraction: f64);
