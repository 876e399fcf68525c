use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::backoff::{Backoff, sleep_or_cancelled};
use super::error::WorkerError;
use super::policy::{ErrorPolicy, Recovery, RedeliverBatch};
use crate::backend::StreamBackend;
use crate::checkpoint::{CheckpointError, CheckpointStore};
use crate::config::ConsumerConfig;
use crate::domain::{Buffer, CursorToken, PartitionId, SequenceNumber, StartPosition};
use crate::handler::Handler;

/// Work done by a partition worker before it stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub partition: PartitionId,
    pub batches_flushed: u64,
    pub records_processed: u64,
    pub batches_skipped: u64,
    pub last_checkpoint: Option<SequenceNumber>,
}

impl WorkerReport {
    fn new(partition: PartitionId) -> Self {
        Self {
            partition,
            batches_flushed: 0,
            records_processed: 0,
            batches_skipped: 0,
            last_checkpoint: None,
        }
    }
}

/// Position a fresh cursor should start from, given the partition's checkpoint
pub async fn start_position<C>(
    checkpoints: &C,
    partition: &PartitionId,
) -> Result<StartPosition, CheckpointError>
where
    C: CheckpointStore + ?Sized,
{
    if checkpoints.exists(partition).await? {
        let seq = checkpoints.sequence_number(partition).await?;
        Ok(StartPosition::AfterSequence(seq))
    } else {
        Ok(StartPosition::OldestRetained)
    }
}

/// Control loop for a single stream partition
///
/// Owns the partition's cursor and [`Buffer`]. Records are appended in the
/// order the backend returns them; whenever the buffer fills up (or its
/// contents are older than the flush interval) the worker calls the handler,
/// then checkpoints the batch's last sequence, then clears the buffer. The
/// checkpoint never moves before the handler has accepted the batch.
pub struct PartitionWorker<B, C, H> {
    partition: PartitionId,
    config: Arc<ConsumerConfig>,
    backend: Arc<B>,
    checkpoints: Arc<C>,
    handler: Arc<H>,
    policy: Arc<dyn ErrorPolicy>,
    buffer: Buffer,
    cursor: Option<CursorToken>,
    poll_backoff: Backoff,
    /// When the oldest record in the buffer arrived
    batch_started: Instant,
    report: WorkerReport,
}

impl<B, C, H> PartitionWorker<B, C, H>
where
    B: StreamBackend,
    C: CheckpointStore,
    H: Handler,
{
    /// Create a worker; without [`PartitionWorker::with_cursor`] it derives its own cursor on start
    pub fn new(
        partition: PartitionId,
        config: Arc<ConsumerConfig>,
        backend: Arc<B>,
        checkpoints: Arc<C>,
        handler: Arc<H>,
    ) -> Self {
        Self {
            buffer: Buffer::new(partition.clone(), config.buffer_size),
            poll_backoff: Backoff::new(config.poll_retry.clone()),
            report: WorkerReport::new(partition.clone()),
            partition,
            config,
            backend,
            checkpoints,
            handler,
            policy: Arc::new(RedeliverBatch),
            cursor: None,
            batch_started: Instant::now(),
        }
    }

    /// Start from an already obtained cursor
    pub fn with_cursor(mut self, cursor: CursorToken) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn with_error_policy(mut self, policy: Arc<dyn ErrorPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn partition(&self) -> &PartitionId {
        &self.partition
    }

    /// Consume the partition until `shutdown` fires or an error exhausts its retries
    ///
    /// On shutdown a partially filled buffer is handed to the handler once
    /// and checkpointed; if that fails the batch is left for redelivery.
    pub async fn run(self, shutdown: CancellationToken) -> Result<WorkerReport, WorkerError> {
        let span = info_span!(
            "partition_worker",
            app = %self.config.app_name,
            stream = %self.config.stream_name,
            partition = %self.partition,
        );
        self.run_loop(shutdown).instrument(span).await
    }

    async fn run_loop(mut self, shutdown: CancellationToken) -> Result<WorkerReport, WorkerError> {
        info!(buffer_size = self.config.buffer_size, "processing");

        loop {
            if shutdown.is_cancelled() {
                self.drain().await;
                info!(
                    batches = self.report.batches_flushed,
                    records = self.report.records_processed,
                    "stopped"
                );
                return Ok(self.report);
            }

            let cursor = match self.cursor.clone() {
                Some(cursor) => cursor,
                None => match self.acquire_cursor().await {
                    Ok(cursor) => {
                        self.cursor = Some(cursor.clone());
                        cursor
                    }
                    Err(e) => {
                        self.retry_after_failure(e, &shutdown).await?;
                        continue;
                    }
                },
            };

            let polled = tokio::select! {
                biased;
                _ = shutdown.cancelled() => continue,
                polled = self.backend.poll(&cursor) => polled,
            };

            let output = match polled {
                Ok(output) => {
                    self.poll_backoff.reset();
                    output
                }
                Err(e) => {
                    if e.is_cursor_error() {
                        self.discard_cursor();
                    }
                    let err = WorkerError::Backend {
                        partition: self.partition.clone(),
                        source: e,
                    };
                    self.retry_after_failure(err, &shutdown).await?;
                    continue;
                }
            };

            let idle = output.records.is_empty();
            debug!(count = output.records.len(), "polled");

            for record in output.records {
                if self.buffer.is_empty() {
                    self.batch_started = Instant::now();
                }
                self.buffer.add_record(record);
                if self.buffer.should_flush() {
                    self.flush(&shutdown).await?;
                    if shutdown.is_cancelled() {
                        break;
                    }
                }
            }

            if !shutdown.is_cancelled()
                && !self.buffer.is_empty()
                && self.batch_started.elapsed() >= self.config.flush_interval
            {
                debug!(count = self.buffer.record_count(), "flush interval elapsed");
                self.flush(&shutdown).await?;
            }

            match output.next_cursor {
                Some(next) if next != cursor => self.cursor = Some(next),
                _ => {
                    debug!("cursor made no progress, re-deriving from checkpoint");
                    self.discard_cursor();
                }
            }

            if idle {
                sleep_or_cancelled(self.config.idle_delay, &shutdown).await;
            }
        }
    }

    /// Ask the backend for a cursor positioned by the partition's checkpoint
    async fn acquire_cursor(&self) -> Result<CursorToken, WorkerError> {
        let position = start_position(self.checkpoints.as_ref(), &self.partition)
            .await
            .map_err(|source| WorkerError::Checkpoint {
                partition: self.partition.clone(),
                source,
            })?;

        debug!(%position, "requesting cursor");
        self.backend
            .get_cursor(&self.config.stream_name, &self.partition, &position)
            .await
            .map_err(|source| WorkerError::Backend {
                partition: self.partition.clone(),
                source,
            })
    }

    /// Forget the cursor; unflushed records will be read again from the checkpoint
    fn discard_cursor(&mut self) {
        self.cursor = None;
        if !self.buffer.is_empty() {
            debug!(
                count = self.buffer.record_count(),
                "dropping unflushed records ahead of cursor refresh"
            );
            self.buffer.flush();
        }
    }

    /// Wait out the poll backoff, or give up with `err` once the budget is spent
    async fn retry_after_failure(
        &mut self,
        err: WorkerError,
        shutdown: &CancellationToken,
    ) -> Result<(), WorkerError> {
        match self.poll_backoff.next_delay() {
            Some(delay) => {
                warn!(
                    error = %err,
                    attempt = self.poll_backoff.failures(),
                    ?delay,
                    "read failed, retrying"
                );
                sleep_or_cancelled(delay, shutdown).await;
                Ok(())
            }
            None => {
                error!(error = %err, attempts = self.poll_backoff.failures(), "giving up");
                Err(err)
            }
        }
    }

    /// Handler, then checkpoint, then clear
    ///
    /// Returns early (buffer untouched) if `shutdown` fires while waiting to
    /// retry; the caller then drains.
    async fn flush(&mut self, shutdown: &CancellationToken) -> Result<(), WorkerError> {
        let Some(last) = self.buffer.last_sequence().cloned() else {
            return Ok(());
        };
        let count = self.buffer.record_count();

        let mut backoff = Backoff::new(self.config.handler_retry.clone());
        let skipped = loop {
            let source = match self.handler.handle_records(&self.buffer).await {
                Ok(()) => break false,
                Err(e) => e,
            };

            match self.policy.on_handler_error(&self.partition, &source) {
                Recovery::Redeliver => match backoff.next_delay() {
                    Some(delay) => {
                        warn!(
                            error = %source,
                            attempt = backoff.failures(),
                            ?delay,
                            count,
                            "handler failed, redelivering batch"
                        );
                        if sleep_or_cancelled(delay, shutdown).await {
                            return Ok(());
                        }
                    }
                    None => {
                        error!(error = %source, attempts = backoff.failures(), "handler retries exhausted");
                        return Err(WorkerError::Handler {
                            partition: self.partition.clone(),
                            source,
                        });
                    }
                },
                Recovery::Skip => {
                    warn!(error = %source, count, sequence = %last, "handler failed, skipping batch");
                    break true;
                }
                Recovery::Abort => {
                    error!(error = %source, count, "handler failed, aborting");
                    return Err(WorkerError::Handler {
                        partition: self.partition.clone(),
                        source,
                    });
                }
            }
        };

        if !self.checkpoint(&last, shutdown).await? {
            return Ok(());
        }

        if skipped {
            self.report.batches_skipped += 1;
        } else {
            self.report.batches_flushed += 1;
            self.report.records_processed += count as u64;
        }
        self.report.last_checkpoint = Some(last.clone());
        self.buffer.flush();

        info!(count, sequence = %last, "flushed");
        Ok(())
    }

    /// Persist `sequence` with retries; `Ok(false)` if shutdown interrupted the retries
    async fn checkpoint(
        &mut self,
        sequence: &SequenceNumber,
        shutdown: &CancellationToken,
    ) -> Result<bool, WorkerError> {
        let mut backoff = Backoff::new(self.config.checkpoint_retry.clone());
        loop {
            let source = match self
                .checkpoints
                .set_checkpoint(&self.partition, sequence)
                .await
            {
                Ok(()) => return Ok(true),
                Err(e) => e,
            };

            match backoff.next_delay() {
                Some(delay) => {
                    warn!(
                        error = %source,
                        attempt = backoff.failures(),
                        ?delay,
                        %sequence,
                        "checkpoint write failed, retrying"
                    );
                    if sleep_or_cancelled(delay, shutdown).await {
                        return Ok(false);
                    }
                }
                None => {
                    error!(error = %source, %sequence, "checkpoint write failed, stopping worker");
                    return Err(WorkerError::Checkpoint {
                        partition: self.partition.clone(),
                        source,
                    });
                }
            }
        }
    }

    /// Single best-effort flush of a partial batch during shutdown
    async fn drain(&mut self) {
        let Some(last) = self.buffer.last_sequence().cloned() else {
            return;
        };
        let count = self.buffer.record_count();

        if let Err(e) = self.handler.handle_records(&self.buffer).await {
            warn!(error = %e, count, "handler failed during shutdown, batch will be redelivered");
            return;
        }
        if let Err(e) = self.checkpoints.set_checkpoint(&self.partition, &last).await {
            warn!(error = %e, count, "checkpoint failed during shutdown, batch will be redelivered");
            return;
        }

        self.report.batches_flushed += 1;
        self.report.records_processed += count as u64;
        self.report.last_checkpoint = Some(last.clone());
        self.buffer.flush();
        info!(count, sequence = %last, "drained");
    }
}
