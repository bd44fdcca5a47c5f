//! FFI (Foreign Function Interface) layer for C bindings.
//!
//! C-compatible functions for driving the engine from C, Python (cffi)
//! or any other language with a C FFI.

pub mod engine;
pub mod types;

pub use engine::*;
pub use types::*;
