//! Runtime for the scatter pipeline: configuration, worker pool, devices
//! and the engine that drives them.

pub mod assignment;
pub mod comm;
pub mod config;
pub mod device;
pub mod engine;
pub mod latch;
pub mod pool;
pub mod queue;
pub mod serial;
pub mod timer;

pub use assignment::Assignment;
pub use comm::{Communicator, GroupCommunicator, LocalCommunicator};
pub use config::{
    DeviceKind, Limits, ScatterConfig, ScatteringParams, ThreadLimits, DEFAULT_SIGNAL_MEMORY,
};
pub use device::{create_device, AllVectorsDevice, ScatterDevice, StagingReport};
pub use engine::{check_signal_budget, EngineStatus, ScatterEngine};
pub use latch::DrainLatch;
pub use pool::{PoolStats, WorkerPool};
pub use queue::StageQueue;
pub use serial::compute_serial;
pub use timer::PhaseTimings;
