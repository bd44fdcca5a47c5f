//! Result writer collaborator.

use crate::data::ScatteringVector;
use crate::error::{ScatterError, ScatterResult};
use num_complex::Complex64;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// One computed vector as handed to the writer.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenVector {
    pub vector: ScatteringVector,
    pub signal: Vec<Complex64>,
    pub frame_count: usize,
}

/// Sink for per-vector results.
pub trait ResultWriter: Send {
    fn write(
        &mut self,
        vector: &ScatteringVector,
        signal: &[Complex64],
        frame_count: usize,
    ) -> ScatterResult<()>;

    /// Called once at the end of a run.
    fn flush(&mut self) -> ScatterResult<()>;
}

/// Keeps every written vector in memory; clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    records: Arc<Mutex<Vec<WrittenVector>>>,
    flushes: Arc<Mutex<usize>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<WrittenVector> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn flush_count(&self) -> usize {
        *self.flushes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResultWriter for MemoryWriter {
    fn write(
        &mut self,
        vector: &ScatteringVector,
        signal: &[Complex64],
        frame_count: usize,
    ) -> ScatterResult<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(WrittenVector {
                vector: *vector,
                signal: signal.to_vec(),
                frame_count,
            });
        Ok(())
    }

    fn flush(&mut self) -> ScatterResult<()> {
        *self.flushes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}

/// Messages understood by the writer service task.
#[derive(Debug)]
pub enum WriterMessage {
    Vector(WrittenVector),
    /// Acknowledged with the number of vectors received so far.
    Flush(oneshot::Sender<usize>),
}

/// Client end of a writer service running on a tokio runtime.
///
/// Must be used from outside the runtime: `flush` blocks on the
/// service's acknowledgement.
#[derive(Debug, Clone)]
pub struct ChannelWriter {
    tx: mpsc::UnboundedSender<WriterMessage>,
}

impl ResultWriter for ChannelWriter {
    fn write(
        &mut self,
        vector: &ScatteringVector,
        signal: &[Complex64],
        frame_count: usize,
    ) -> ScatterResult<()> {
        self.tx
            .send(WriterMessage::Vector(WrittenVector {
                vector: *vector,
                signal: signal.to_vec(),
                frame_count,
            }))
            .map_err(|_| ScatterError::Writer("writer service has shut down".into()))
    }

    fn flush(&mut self) -> ScatterResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(WriterMessage::Flush(ack_tx))
            .map_err(|_| ScatterError::Writer("writer service has shut down".into()))?;
        let received = ack_rx
            .blocking_recv()
            .map_err(|_| ScatterError::Writer("writer service dropped flush".into()))?;
        debug!(received, "writer flushed");
        Ok(())
    }
}

/// Spawn a writer service on `handle`. The task finishes with every
/// received vector once all clients are dropped.
pub fn spawn_writer_service(handle: &Handle) -> (ChannelWriter, JoinHandle<Vec<WrittenVector>>) {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let task = handle.spawn(async move {
        let mut received = Vec::new();
        while let Some(message) = rx.recv().await {
            match message {
                WriterMessage::Vector(record) => received.push(record),
                WriterMessage::Flush(ack) => {
                    let _ = ack.send(received.len());
                }
            }
        }
        received
    });

    (ChannelWriter { tx }, task)
}
