pub mod error;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::Buffer;

pub use error::HandlerError;

/// User-supplied processing of a full batch
///
/// Called with the worker's buffer once the flush condition holds. The
/// checkpoint only advances after this returns `Ok`, and a batch can be
/// delivered again after a crash or a failed attempt, so implementations
/// should tolerate reprocessing. The buffer is cleared right after the call.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle_records(&self, batch: &Buffer) -> Result<(), HandlerError>;
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn handle_records(&self, batch: &Buffer) -> Result<(), HandlerError> {
        (**self).handle_records(batch).await
    }
}
