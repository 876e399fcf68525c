//! Partitioned stream consumer with durable per-partition checkpoints.
//!
//! A [`StreamConsumer`](streaming::StreamConsumer) lists the partitions of a
//! stream and runs one [`PartitionWorker`](streaming::PartitionWorker) per
//! partition. Each worker batches records into a [`Buffer`](domain::Buffer),
//! hands full batches to a user [`Handler`](handler::Handler) and only then
//! advances the partition's checkpoint, giving at-least-once delivery.

pub mod app;
pub mod backend;
pub mod checkpoint;
pub mod config;
pub mod domain;
pub mod handler;
pub mod prelude;
pub mod streaming;
