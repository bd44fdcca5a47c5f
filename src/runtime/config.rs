//! Runtime configuration.

use crate::data::{Averaging, SYSTEM_SELECTION};
use crate::error::{ScatterError, ScatterResult};
use crate::stage::SignalProcessing;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default signal buffer budget (500 MiB).
pub const DEFAULT_SIGNAL_MEMORY: usize = 500 * 1024 * 1024;

/// Full configuration for a scattering run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterConfig {
    pub limits: Limits,
    pub scattering: ScatteringParams,
    /// Computation strategy.
    pub device: DeviceKind,
}

impl ScatterConfig {
    pub fn from_json_str(json: &str) -> ScatterResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> ScatterResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ScatterError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> ScatterResult<()> {
        self.limits.threads.validate()?;
        self.scattering.averaging.validate()
    }
}

/// Resource limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum bytes for the per-vector signal buffers.
    pub signal_memory: usize,
    pub threads: ThreadLimits,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            signal_memory: DEFAULT_SIGNAL_MEMORY,
            threads: ThreadLimits::default(),
        }
    }
}

/// Worker pool sizing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadLimits {
    /// Use the threaded pipeline; otherwise compute serially.
    pub on: bool,
    pub amplitude_workers: usize,
    pub transform_workers: usize,
    pub accumulate_workers: usize,
    /// Capacity of each stage queue.
    pub queue_capacity: usize,
}

impl Default for ThreadLimits {
    fn default() -> Self {
        let cpus = num_cpus::get().max(2);
        Self {
            on: true,
            amplitude_workers: (cpus / 2).max(1),
            transform_workers: (cpus / 2).max(1),
            accumulate_workers: 1,
            queue_capacity: 64,
        }
    }
}

impl ThreadLimits {
    pub fn validate(&self) -> ScatterResult<()> {
        if self.amplitude_workers == 0 || self.transform_workers == 0 || self.accumulate_workers == 0
        {
            return Err(ScatterError::Config(
                "every stage needs at least one worker".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ScatterError::Config("queue capacity must be positive".into()));
        }
        Ok(())
    }

    pub fn total_workers(&self) -> usize {
        self.amplitude_workers + self.transform_workers + self.accumulate_workers
    }
}

/// Scattering parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatteringParams {
    /// Selection whose atoms scatter.
    pub target: String,
    /// Scattering length subtracted from every target atom.
    pub background: f64,
    pub averaging: Averaging,
    pub processing: SignalProcessing,
}

impl Default for ScatteringParams {
    fn default() -> Self {
        Self {
            target: SYSTEM_SELECTION.to_string(),
            background: 0.0,
            averaging: Averaging::None,
            processing: SignalProcessing::Autocorrelate,
        }
    }
}

/// Closed set of computation strategies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Every subvector of a vector is one pipeline work item.
    #[default]
    AllVectors,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScatterConfig::default();
        assert_eq!(config.limits.signal_memory, DEFAULT_SIGNAL_MEMORY);
        assert!(config.limits.threads.on);
        assert_eq!(config.scattering.target, "system");
        assert_eq!(config.device, DeviceKind::AllVectors);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = ScatterConfig::from_json_str(
            r#"{
                "limits": { "signal_memory": 1024, "threads": { "on": false } },
                "scattering": {
                    "target": "protein",
                    "averaging": { "kind": "sphere", "resolution": 20 },
                    "processing": "square"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.limits.signal_memory, 1024);
        assert!(!config.limits.threads.on);
        assert_eq!(config.limits.threads.queue_capacity, 64);
        assert_eq!(config.scattering.target, "protein");
        assert_eq!(config.scattering.averaging, Averaging::Sphere { resolution: 20 });
        assert_eq!(config.scattering.processing, SignalProcessing::Square);
    }

    #[test]
    fn test_invalid_threads() {
        let result = ScatterConfig::from_json_str(r#"{"limits": {"threads": {"queue_capacity": 0}}}"#);
        assert!(matches!(result, Err(ScatterError::Config(_))));

        let result = ScatterConfig::from_json_str(r#"{"limits": {"threads": {"transform_workers": 0}}}"#);
        assert!(matches!(result, Err(ScatterError::Config(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ScatterConfig::from_json_str("{ not json"),
            Err(ScatterError::Config(_))
        ));
    }
}
