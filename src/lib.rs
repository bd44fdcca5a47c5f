//! Scatter Rust Runtime - scattering intensity from molecular trajectories.
//!
//! This crate computes, for every scattering vector q, the time signal of
//! the coherent scattering amplitude of a trajectory and its
//! autocorrelation, with:
//!
//! - A long-lived three-stage worker pool (amplitude, transform, accumulate)
//! - A serial path producing the same result on the calling thread
//! - Orientational averaging over subvectors
//! - Fail-fast signal memory checks before any buffer is allocated
//! - FFI layer for Python (cffi) and other language bindings
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     FFI Layer (scatrs.h)            │
//! │  C-compatible functions & types     │
//! └─────────────────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────┐
//! │            ScatterEngine            │
//! │  stage → compute → write → next     │
//! │  ┌───────────┐  ┌───────────────┐  │
//! │  │  Device   │  │ Writer/Monitor│  │
//! │  │(strategy) │  │   services    │  │
//! │  └───────────┘  └───────────────┘  │
//! │  ┌───────────────────────────────┐  │
//! │  │ WorkerPool: q → A(t) → C(t)   │  │
//! │  │   → SharedAccumulator         │  │
//! │  └───────────────────────────────┘  │
//! └─────────────────────────────────────┘
//! ```
//!
//! # FFI Usage
//!
//! ```c
//! // Create engine
//! EngineHandle engine;
//! scat_engine_create(config_json, lengths, n_atoms, positions, n_frames,
//!                    vectors, n_vectors, on_vector, on_progress, user_data,
//!                    &engine);
//!
//! // Run (blocking); on_vector fires once per vector
//! scat_engine_run(engine);
//!
//! // Cleanup
//! scat_engine_free(engine);
//! ```

pub mod data;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod runtime;
pub mod service;
pub mod stage;

// Re-export commonly used items
pub use data::{Atom, Averaging, Motion, Sample, SampleError, ScatteringVector, SharedAccumulator};
pub use error::{ScatterError, ScatterResult};
pub use runtime::{
    Communicator, EngineStatus, GroupCommunicator, LocalCommunicator, ScatterConfig,
    ScatterDevice, ScatterEngine, WorkerPool,
};
pub use service::{MemoryMonitor, MemoryWriter, ProgressMonitor, ResultWriter};
pub use stage::{ScatterKernel, SignalProcessing, StageId};

// Re-export FFI types for cbindgen
pub use ffi::engine::*;
pub use ffi::types::*;
