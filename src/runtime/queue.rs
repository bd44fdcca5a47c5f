//! Bounded hand-off queues between pipeline stages.

use crossbeam_channel::{bounded, Receiver, Sender};

/// A bounded FIFO connecting two stages.
///
/// Items move by value, so a buffer has exactly one owner at a time. The
/// queue closes once every sender is dropped; receivers then drain what is
/// left and stop.
pub struct StageQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> StageQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<T> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<T> {
        self.rx.clone()
    }

    /// Split into the two ends, dropping the queue's own handles.
    pub fn into_parts(self) -> (Sender<T>, Receiver<T>) {
        (self.tx, self.rx)
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
