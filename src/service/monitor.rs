//! Progress monitor collaborator.

use crate::error::{ScatterError, ScatterResult};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// Receives progress fractions in [0, 1] per global rank.
pub trait ProgressMonitor: Send {
    fn update(&mut self, rank: usize, fraction: f64) -> ScatterResult<()>;
}

/// Records every update; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemoryMonitor {
    updates: Arc<Mutex<Vec<(usize, f64)>>>,
}

impl MemoryMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<(usize, f64)> {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProgressMonitor for MemoryMonitor {
    fn update(&mut self, rank: usize, fraction: f64) -> ScatterResult<()> {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((rank, fraction));
        Ok(())
    }
}

/// Reports progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMonitor;

impl ProgressMonitor for LogMonitor {
    fn update(&mut self, rank: usize, fraction: f64) -> ScatterResult<()> {
        info!(rank, percent = fraction * 100.0, "progress");
        Ok(())
    }
}

/// Client end of a monitor service running on a tokio runtime.
#[derive(Debug, Clone)]
pub struct ChannelMonitor {
    tx: mpsc::UnboundedSender<(usize, f64)>,
}

impl ProgressMonitor for ChannelMonitor {
    fn update(&mut self, rank: usize, fraction: f64) -> ScatterResult<()> {
        self.tx
            .send((rank, fraction))
            .map_err(|_| ScatterError::Monitor("monitor service has shut down".into()))
    }
}

/// Spawn a monitor service on `handle`; it finishes with the received
/// updates once every client is dropped.
pub fn spawn_monitor_service(handle: &Handle) -> (ChannelMonitor, JoinHandle<Vec<(usize, f64)>>) {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let task = handle.spawn(async move {
        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }
        updates
    });

    (ChannelMonitor { tx }, task)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_monitor() {
        let monitor = MemoryMonitor::new();
        let mut handle = monitor.clone();
        handle.update(3, 0.5).unwrap();
        handle.update(3, 1.0).unwrap();
        assert_eq!(monitor.updates(), vec![(3, 0.5), (3, 1.0)]);
    }

    #[test]
    fn test_monitor_service() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();

        let (mut monitor, task) = spawn_monitor_service(runtime.handle());
        monitor.update(0, 1.0).unwrap();
        drop(monitor);

        assert_eq!(runtime.block_on(task).unwrap(), vec![(0, 1.0)]);
    }
}
