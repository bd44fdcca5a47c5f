//! FFI functions for engine management.

use super::types::{CComplex, ProgressCallback, ScatEngineStatus, ScatStatus, VectorCallback};
use crate::data::{Atom, Sample, ScatteringVector};
use crate::error::{ScatterError, ScatterResult};
use crate::logging::init_tracing;
use crate::runtime::{LocalCommunicator, ScatterConfig, ScatterEngine};
use crate::service::{ProgressMonitor, ResultWriter};
use num_complex::Complex64;
use std::ffi::{c_char, c_void, CStr};
use std::sync::Arc;
use tracing::warn;

/// Opaque handle to an engine.
pub type EngineHandle = *mut ScatterEngine;

/// Forwards each written vector to a C callback.
struct CallbackWriter {
    callback: Option<VectorCallback>,
    // Stored as usize so the writer is Send.
    user_data: usize,
    written: usize,
}

impl ResultWriter for CallbackWriter {
    fn write(
        &mut self,
        vector: &ScatteringVector,
        signal: &[Complex64],
        frame_count: usize,
    ) -> ScatterResult<()> {
        let index = self.written;
        self.written += 1;

        let Some(callback) = self.callback else {
            return Ok(());
        };
        let q = [vector.x, vector.y, vector.z];
        let values: Vec<CComplex> = signal.iter().copied().map(CComplex::from).collect();

        match callback(
            self.user_data as *mut c_void,
            index,
            q.as_ptr(),
            values.as_ptr(),
            frame_count,
        ) {
            ScatStatus::Ok => Ok(()),
            status => Err(ScatterError::Writer(format!(
                "vector callback returned {:?} for vector {}",
                status, index
            ))),
        }
    }

    fn flush(&mut self) -> ScatterResult<()> {
        Ok(())
    }
}

struct CallbackMonitor {
    callback: Option<ProgressCallback>,
    user_data: usize,
}

impl ProgressMonitor for CallbackMonitor {
    fn update(&mut self, rank: usize, fraction: f64) -> ScatterResult<()> {
        if let Some(callback) = self.callback {
            callback(self.user_data as *mut c_void, rank, fraction);
        }
        Ok(())
    }
}

/// Copy `len` values from `ptr`. A null pointer is only accepted for an
/// empty slice.
unsafe fn read_f64s(ptr: *const f64, len: usize) -> Result<Vec<f64>, ScatStatus> {
    if len == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err(ScatStatus::NullPointer);
    }
    Ok(std::slice::from_raw_parts(ptr, len).to_vec())
}

unsafe fn read_config(config_json: *const c_char) -> Result<ScatterConfig, ScatStatus> {
    if config_json.is_null() {
        return Ok(ScatterConfig::default());
    }
    let text = CStr::from_ptr(config_json)
        .to_str()
        .map_err(|_| ScatStatus::InvalidUtf8)?;
    ScatterConfig::from_json_str(text).map_err(|e| ScatStatus::from(&e))
}

/// Create an engine over a single-process trajectory.
///
/// `positions` holds `frame_count * atom_count * 3` values, frame-major
/// (frame, atom, xyz). `vectors` holds `vector_count * 3` values. Array
/// pointers may be null when their length is zero. A null `config_json`
/// selects the default configuration. Callbacks may be null.
///
/// # Safety
/// All non-null pointers must be valid for the given lengths; `out_handle`
/// must be valid. `user_data` must stay valid until the engine is freed.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn scat_engine_create(
    config_json: *const c_char,
    scattering_lengths: *const f64,
    atom_count: usize,
    positions: *const f64,
    frame_count: usize,
    vectors: *const f64,
    vector_count: usize,
    on_vector: Option<VectorCallback>,
    on_progress: Option<ProgressCallback>,
    user_data: *mut c_void,
    out_handle: *mut EngineHandle,
) -> ScatStatus {
    if out_handle.is_null() {
        return ScatStatus::NullPointer;
    }

    let (Some(position_len), Some(vector_len)) = (
        frame_count
            .checked_mul(atom_count)
            .and_then(|n| n.checked_mul(3)),
        vector_count.checked_mul(3),
    ) else {
        return ScatStatus::LengthMismatch;
    };

    let config = match read_config(config_json) {
        Ok(config) => config,
        Err(status) => return status,
    };

    let (lengths, flat, vector_values) = match (
        read_f64s(scattering_lengths, atom_count),
        read_f64s(positions, position_len),
        read_f64s(vectors, vector_len),
    ) {
        (Ok(l), Ok(p), Ok(v)) => (l, p, v),
        _ => return ScatStatus::NullPointer,
    };

    let atoms = lengths
        .into_iter()
        .enumerate()
        .map(|(i, b)| Atom::new(format!("atom{}", i), b))
        .collect();
    let sample = match Sample::from_flat(atoms, flat, frame_count) {
        Ok(sample) => Arc::new(sample),
        Err(_) => return ScatStatus::LengthMismatch,
    };

    let vectors = vector_values
        .chunks_exact(3)
        .map(|c| ScatteringVector::new(c[0], c[1], c[2]))
        .collect();

    let user_data = user_data as usize;
    let writer = CallbackWriter {
        callback: on_vector,
        user_data,
        written: 0,
    };
    let monitor = CallbackMonitor {
        callback: on_progress,
        user_data,
    };

    match ScatterEngine::new(
        Arc::new(LocalCommunicator),
        Arc::new(LocalCommunicator),
        sample,
        vectors,
        &config,
        Box::new(writer),
        Box::new(monitor),
    ) {
        Ok(engine) => {
            *out_handle = Box::into_raw(Box::new(engine));
            ScatStatus::Ok
        }
        Err(err) => ScatStatus::from(&err),
    }
}

/// Run the engine to completion (blocking).
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn scat_engine_run(handle: EngineHandle) -> ScatStatus {
    if handle.is_null() {
        return ScatStatus::NullPointer;
    }

    match (*handle).run() {
        Ok(()) => ScatStatus::Ok,
        Err(err) => {
            warn!(error = %err, "engine run failed");
            ScatStatus::from(&err)
        }
    }
}

/// Fraction of vectors done; 0 for a null handle.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn scat_engine_progress(handle: EngineHandle) -> f64 {
    if handle.is_null() {
        return 0.0;
    }
    (*handle).progress()
}

/// Loop state; `Done` for a null handle.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn scat_engine_status(handle: EngineHandle) -> ScatEngineStatus {
    if handle.is_null() {
        return ScatEngineStatus::Done;
    }
    (*handle).status().into()
}

/// Free an engine handle.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn scat_engine_free(handle: EngineHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Install the log subscriber. A null filter means `"info"`.
///
/// # Safety
/// `filter` must be a valid C string or null.
#[no_mangle]
pub unsafe extern "C" fn scat_logging_init(filter: *const c_char) -> ScatStatus {
    let filter = if filter.is_null() {
        "info"
    } else {
        match CStr::from_ptr(filter).to_str() {
            Ok(s) => s,
            Err(_) => return ScatStatus::InvalidUtf8,
        }
    };

    match init_tracing(filter) {
        Ok(()) => ScatStatus::Ok,
        Err(err) => ScatStatus::from(&err),
    }
}
