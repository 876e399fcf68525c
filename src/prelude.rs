//! Prelude module for convenient imports
//!
//! Import everything you need with: `use connector::prelude::*;`

// Domain types
pub use crate::domain::{Buffer, CursorToken, PartitionId, Record, SequenceNumber, StartPosition};

// Backend types
pub use crate::backend::{BackendError, MemoryStream, PollOutput, StreamBackend};

// Checkpoint types
pub use crate::checkpoint::{
    CheckpointError, CheckpointKey, CheckpointStore, FileCheckpoint, MemoryCheckpoint,
};

// Handler types
pub use crate::handler::{Handler, HandlerError};

// Config types
pub use crate::config::{ConfigError, ConsumerConfig, MAX_BUFFER_SIZE, RetryPolicy};

// Streaming types
pub use crate::streaming::{
    AbortOnError, ConsumerHandle, ConsumerResults, ErrorPolicy, PartitionWorker, Recovery,
    RedeliverBatch, SkipBatch, StartupError, StreamConsumer, WorkerError, WorkerReport,
};

// App types
pub use crate::app::{AppError, CliApp};
