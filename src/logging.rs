//! `tracing` subscriber setup.

use crate::error::{ScatterError, ScatterResult};
use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber filtered by `filter` (`RUST_LOG`
/// syntax, e.g. `"scatrs=debug"`). Later calls leave the first
/// subscriber in place.
pub fn init_tracing(filter: &str) -> ScatterResult<()> {
    let filter = EnvFilter::try_new(filter)
        .map_err(|e| ScatterError::Config(format!("invalid log filter: {}", e)))?;

    // Fails only when a global subscriber already exists.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .try_init();
    Ok(())
}
