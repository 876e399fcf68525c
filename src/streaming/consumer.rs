use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::error::{StartupError, WorkerError};
use super::policy::{ErrorPolicy, RedeliverBatch};
use super::worker::{PartitionWorker, WorkerReport, start_position};
use crate::backend::StreamBackend;
use crate::checkpoint::CheckpointStore;
use crate::config::ConsumerConfig;
use crate::domain::PartitionId;
use crate::handler::Handler;

/// Consumes every partition of a stream with one worker task each
///
/// Partitions are discovered once, at [`StreamConsumer::start`]. Workers share
/// the backend, the checkpoint store and the handler but never talk to each
/// other.
pub struct StreamConsumer<B, C> {
    config: Arc<ConsumerConfig>,
    backend: Arc<B>,
    checkpoints: Arc<C>,
    error_policy: Arc<dyn ErrorPolicy>,
}

impl<B, C> StreamConsumer<B, C>
where
    B: StreamBackend + 'static,
    C: CheckpointStore + 'static,
{
    /// Create a consumer over a shared backend and checkpoint store
    ///
    /// # Example
    /// ```rust,ignore
    /// let backend = Arc::new(MemoryStream::new("orders", 2));
    /// let checkpoints = Arc::new(MemoryCheckpoint::new("billing", "orders"));
    /// let config = ConsumerConfig::new("billing", "orders", "local");
    ///
    /// let handle = StreamConsumer::new(config, backend, checkpoints)
    ///     .with_error_policy(SkipBatch)
    ///     .start(MyHandler)
    ///     .await?;
    /// ```
    pub fn new(config: ConsumerConfig, backend: Arc<B>, checkpoints: Arc<C>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            checkpoints,
            error_policy: Arc::new(RedeliverBatch),
        }
    }

    /// Set how handler failures are treated (defaults to [`RedeliverBatch`])
    pub fn with_error_policy<P>(mut self, policy: P) -> Self
    where
        P: ErrorPolicy + 'static,
    {
        self.error_policy = Arc::new(policy);
        self
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    pub fn checkpoints(&self) -> &Arc<C> {
        &self.checkpoints
    }

    /// Discover partitions and spawn a worker for each
    ///
    /// Takes the consumer by value: a consumer starts at most once, so every
    /// partition has a single worker writing its checkpoint.
    pub async fn start<H>(self, handler: H) -> Result<ConsumerHandle, StartupError>
    where
        H: Handler + 'static,
    {
        self.start_with_shutdown(handler, CancellationToken::new())
            .await
    }

    /// Like [`StreamConsumer::start`], with workers stopping when `shutdown` is cancelled
    ///
    /// Configuration, partition discovery and every initial cursor are
    /// resolved before the first worker is spawned, so a startup error
    /// leaves nothing running.
    pub async fn start_with_shutdown<H>(
        self,
        handler: H,
        shutdown: CancellationToken,
    ) -> Result<ConsumerHandle, StartupError>
    where
        H: Handler + 'static,
    {
        self.config.validate()?;

        let stream = &self.config.stream_name;
        let partitions = self
            .backend
            .list_partitions(stream)
            .await
            .map_err(|source| {
                error!(stream = %stream, error = %source, "list partitions failed");
                StartupError::ListPartitions {
                    stream: stream.clone(),
                    source,
                }
            })?;

        let mut cursors = Vec::with_capacity(partitions.len());
        for partition in partitions {
            let position = start_position(self.checkpoints.as_ref(), &partition)
                .await
                .map_err(|source| {
                    error!(partition = %partition, error = %source, "checkpoint read failed");
                    StartupError::Checkpoint {
                        partition: partition.clone(),
                        source,
                    }
                })?;

            let cursor = self
                .backend
                .get_cursor(stream, &partition, &position)
                .await
                .map_err(|source| {
                    error!(partition = %partition, error = %source, "initial cursor failed");
                    StartupError::InitialCursor {
                        partition: partition.clone(),
                        source,
                    }
                })?;

            info!(partition = %partition, %position, "initial cursor acquired");
            cursors.push((partition, cursor));
        }

        let handler = Arc::new(handler);
        let workers = cursors
            .into_iter()
            .map(|(partition, cursor)| {
                let worker = PartitionWorker::new(
                    partition.clone(),
                    Arc::clone(&self.config),
                    Arc::clone(&self.backend),
                    Arc::clone(&self.checkpoints),
                    Arc::clone(&handler),
                )
                .with_cursor(cursor)
                .with_error_policy(Arc::clone(&self.error_policy));

                let handle = tokio::spawn(worker.run(shutdown.child_token()));
                (partition, handle)
            })
            .collect::<Vec<_>>();

        info!(
            app = %self.config.app_name,
            stream = %stream,
            region = %self.config.region,
            workers = workers.len(),
            "consumer started"
        );

        Ok(ConsumerHandle { shutdown, workers })
    }
}

/// Supervisor for the workers spawned by [`StreamConsumer::start`]
pub struct ConsumerHandle {
    shutdown: CancellationToken,
    workers: Vec<(PartitionId, JoinHandle<Result<WorkerReport, WorkerError>>)>,
}

impl ConsumerHandle {
    /// Partitions being consumed, in discovery order
    pub fn partitions(&self) -> Vec<PartitionId> {
        self.workers.iter().map(|(p, _)| p.clone()).collect()
    }

    /// Token whose cancellation stops every worker
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// True once every worker task has returned
    pub fn is_finished(&self) -> bool {
        self.workers.iter().all(|(_, handle)| handle.is_finished())
    }

    /// Stop all workers, let them drain, and collect their results
    pub async fn shutdown(self) -> ConsumerResults {
        info!("shutting down consumer");
        self.shutdown.cancel();
        self.join().await
    }

    /// Wait for every worker to return without asking them to stop
    pub async fn join(self) -> ConsumerResults {
        let (partitions, handles): (Vec<_>, Vec<_>) = self.workers.into_iter().unzip();
        let outcomes = join_all(handles).await;

        let worker_results = partitions
            .into_iter()
            .zip(outcomes)
            .map(|(partition, outcome)| match outcome {
                Ok(result) => result,
                Err(e) => {
                    error!(partition = %partition, error = %e, "worker task failed");
                    Err(WorkerError::Panicked(partition))
                }
            })
            .collect();

        ConsumerResults { worker_results }
    }
}

/// Outcome of every worker of a consumer
#[derive(Debug)]
pub struct ConsumerResults {
    pub worker_results: Vec<Result<WorkerReport, WorkerError>>,
}

impl ConsumerResults {
    /// Check if every worker stopped cleanly
    pub fn all_succeeded(&self) -> bool {
        self.worker_results.iter().all(|r| r.is_ok())
    }

    pub fn total_workers(&self) -> usize {
        self.worker_results.len()
    }

    pub fn reports(&self) -> impl Iterator<Item = &WorkerReport> {
        self.worker_results.iter().filter_map(|r| r.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &WorkerError> {
        self.worker_results.iter().filter_map(|r| r.as_ref().err())
    }

    /// Total records handed to the handler and checkpointed
    pub fn records_processed(&self) -> u64 {
        self.reports().map(|r| r.records_processed).sum()
    }
}
