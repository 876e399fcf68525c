use thiserror::Error;

use crate::backend::BackendError;
use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;
use crate::domain::PartitionId;
use crate::handler::HandlerError;

/// Failures that prevent a consumer from starting
///
/// Returned to the caller instead of terminating the process, so the
/// embedding application decides whether to exit or retry.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to list partitions of stream {stream}: {source}")]
    ListPartitions {
        stream: String,
        #[source]
        source: BackendError,
    },

    #[error("Failed to read checkpoint for partition {partition}: {source}")]
    Checkpoint {
        partition: PartitionId,
        #[source]
        source: CheckpointError,
    },

    #[error("Failed to obtain initial cursor for partition {partition}: {source}")]
    InitialCursor {
        partition: PartitionId,
        #[source]
        source: BackendError,
    },
}

/// Failures that stop a single partition worker
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Backend error on partition {partition}: {source}")]
    Backend {
        partition: PartitionId,
        #[source]
        source: BackendError,
    },

    #[error("Handler error on partition {partition}: {source}")]
    Handler {
        partition: PartitionId,
        #[source]
        source: HandlerError,
    },

    #[error("Checkpoint error on partition {partition}: {source}")]
    Checkpoint {
        partition: PartitionId,
        #[source]
        source: CheckpointError,
    },

    #[error("Worker for partition {0} panicked")]
    Panicked(PartitionId),
}

impl WorkerError {
    /// Partition whose worker failed
    pub fn partition(&self) -> &PartitionId {
        match self {
            Self::Backend { partition, .. } => partition,
            Self::Handler { partition, .. } => partition,
            Self::Checkpoint { partition, .. } => partition,
            Self::Panicked(partition) => partition,
        }
    }
}
