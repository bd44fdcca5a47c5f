//! External collaborators: result writer and progress monitor.

pub mod monitor;
pub mod writer;

pub use monitor::{spawn_monitor_service, ChannelMonitor, LogMonitor, MemoryMonitor, ProgressMonitor};
pub use writer::{
    spawn_writer_service, ChannelWriter, MemoryWriter, ResultWriter, WriterMessage, WrittenVector,
};
