use std::fmt;

use async_trait::async_trait;

use super::error::CheckpointError;
use crate::domain::{PartitionId, SequenceNumber};

/// Storage key of a checkpoint: `{application}:{stream}:{partition}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckpointKey<'a> {
    pub application: &'a str,
    pub stream: &'a str,
    pub partition: &'a PartitionId,
}

impl fmt::Display for CheckpointKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.application, self.stream, self.partition)
    }
}

/// Durable per-partition progress markers
///
/// A store is scoped to one (application, stream) pair at construction.
/// Workers of the same consumer share a store and call it concurrently for
/// distinct partitions; a single partition is only ever written by its own
/// worker.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Whether a checkpoint has ever been written for the partition
    async fn exists(&self, partition: &PartitionId) -> Result<bool, CheckpointError>;

    /// Last checkpointed sequence, or [`CheckpointError::NotFound`]
    async fn sequence_number(
        &self,
        partition: &PartitionId,
    ) -> Result<SequenceNumber, CheckpointError>;

    /// Durably record `sequence` as the partition's checkpoint, replacing any prior value
    async fn set_checkpoint(
        &self,
        partition: &PartitionId,
        sequence: &SequenceNumber,
    ) -> Result<(), CheckpointError>;
}
