use crate::domain::PartitionId;
use crate::handler::HandlerError;

/// What a worker does with a batch whose handler call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Keep the batch and hand it to the handler again after a backoff
    Redeliver,

    /// Checkpoint past the batch and drop it
    Skip,

    /// Stop the worker without checkpointing
    Abort,
}

/// Policy for handling handler failures during stream consumption
pub trait ErrorPolicy: Send + Sync {
    fn on_handler_error(&self, partition: &PartitionId, error: &HandlerError) -> Recovery;
}

/// Redeliver the same batch until the handler accepts it (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct RedeliverBatch;

impl ErrorPolicy for RedeliverBatch {
    fn on_handler_error(&self, _partition: &PartitionId, _error: &HandlerError) -> Recovery {
        Recovery::Redeliver
    }
}

/// Drop failed batches and keep consuming
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipBatch;

impl ErrorPolicy for SkipBatch {
    fn on_handler_error(&self, _partition: &PartitionId, _error: &HandlerError) -> Recovery {
        Recovery::Skip
    }
}

/// Stop the worker on the first handler failure
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnError;

impl ErrorPolicy for AbortOnError {
    fn on_handler_error(&self, _partition: &PartitionId, _error: &HandlerError) -> Recovery {
        Recovery::Abort
    }
}
