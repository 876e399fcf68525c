use async_trait::async_trait;
use dashmap::DashMap;

use super::error::CheckpointError;
use super::traits::{CheckpointKey, CheckpointStore};
use crate::domain::{PartitionId, SequenceNumber};

/// Concurrent in-memory checkpoint store using DashMap
///
/// Progress does not survive the process; useful for tests and for
/// consumers that are happy to replay from the oldest retained record.
pub struct MemoryCheckpoint {
    application: String,
    stream: String,
    entries: DashMap<String, SequenceNumber>,
}

impl MemoryCheckpoint {
    /// Create an empty store scoped to an application and stream
    pub fn new(application: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            stream: stream.into(),
            entries: DashMap::new(),
        }
    }

    fn key(&self, partition: &PartitionId) -> String {
        CheckpointKey {
            application: &self.application,
            stream: &self.stream,
            partition,
        }
        .to_string()
    }

    /// Number of partitions with a recorded checkpoint
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpoint {
    async fn exists(&self, partition: &PartitionId) -> Result<bool, CheckpointError> {
        Ok(self.entries.contains_key(&self.key(partition)))
    }

    async fn sequence_number(
        &self,
        partition: &PartitionId,
    ) -> Result<SequenceNumber, CheckpointError> {
        let key = self.key(partition);
        self.entries
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or(CheckpointError::NotFound(key))
    }

    async fn set_checkpoint(
        &self,
        partition: &PartitionId,
        sequence: &SequenceNumber,
    ) -> Result<(), CheckpointError> {
        self.entries.insert(self.key(partition), sequence.clone());
        Ok(())
    }
}
