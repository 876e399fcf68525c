mod backoff;
pub mod consumer;
pub mod error;
pub mod policy;
pub mod worker;

// Re-export commonly used types
pub use consumer::{ConsumerHandle, ConsumerResults, StreamConsumer};
pub use error::{StartupError, WorkerError};
pub use policy::{AbortOnError, ErrorPolicy, Recovery, RedeliverBatch, SkipBatch};
pub use worker::{PartitionWorker, WorkerReport, start_position};
