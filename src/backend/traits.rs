use async_trait::async_trait;

use super::error::BackendError;
use crate::domain::{CursorToken, PartitionId, Record, StartPosition};

/// Result of a single poll against a partition cursor
#[derive(Debug, Clone, Default)]
pub struct PollOutput {
    /// Records in partition order
    pub records: Vec<Record>,

    /// Cursor for the next poll; `None` when the backend has none to offer
    pub next_cursor: Option<CursorToken>,
}

/// Read access to a partitioned, append-only stream
///
/// Implementations wrap a concrete service client and are shared by every
/// partition worker of a consumer, so they must be safe for concurrent use.
#[async_trait]
pub trait StreamBackend: Send + Sync {
    /// List the partitions of a stream
    async fn list_partitions(&self, stream: &str) -> Result<Vec<PartitionId>, BackendError>;

    /// Obtain a cursor for a partition at the requested position
    async fn get_cursor(
        &self,
        stream: &str,
        partition: &PartitionId,
        position: &StartPosition,
    ) -> Result<CursorToken, BackendError>;

    /// Read the next batch of records at a cursor
    async fn poll(&self, cursor: &CursorToken) -> Result<PollOutput, BackendError>;
}
