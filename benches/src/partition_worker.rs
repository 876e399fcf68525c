use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use connector::prelude::*;
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

/// Accepts every batch and fires `done` once `expected` records went through
struct CountingHandler {
    seen: AtomicUsize,
    expected: usize,
    done: CancellationToken,
}

impl CountingHandler {
    fn new(expected: usize, done: CancellationToken) -> Self {
        Self {
            seen: AtomicUsize::new(0),
            expected,
            done,
        }
    }
}

#[async_trait]
impl Handler for CountingHandler {
    async fn handle_records(&self, batch: &Buffer) -> Result<(), HandlerError> {
        let total = self.seen.fetch_add(batch.record_count(), Ordering::Relaxed) + batch.record_count();
        black_box(batch.last_sequence());
        if total >= self.expected {
            self.done.cancel();
        }
        Ok(())
    }
}

fn seeded_stream(partitions: usize, per_partition: usize) -> Arc<MemoryStream> {
    let stream = MemoryStream::new("bench", partitions);
    for partition in stream.partition_ids().to_vec() {
        for i in 0..per_partition {
            stream
                .put_record_to(&partition, format!("payload-{:08}", i), "key")
                .unwrap();
        }
    }
    Arc::new(stream)
}

fn config(buffer_size: usize) -> ConsumerConfig {
    ConsumerConfig::new("bench", "bench", "local")
        .with_buffer_size(buffer_size)
        .with_idle_delay(Duration::from_millis(1))
}

/// Benchmark filling a buffer up to its flush threshold
fn bench_buffer_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_fill");

    for size in [10, 100, MAX_BUFFER_SIZE] {
        let records: Vec<Record> = (1..=size as u64)
            .map(|i| Record::new(format!("payload-{}", i), i, "key"))
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter_batched(
                || Buffer::new(PartitionId::from("shard-0"), size),
                |mut buffer| {
                    for record in records {
                        buffer.add_record(record.clone());
                    }
                    black_box(buffer.should_flush());
                    buffer.flush();
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark one worker consuming a seeded partition for several buffer sizes
fn bench_worker_buffer_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("worker_buffer_sizes");
    let runtime = Runtime::new().unwrap();
    let records = 10_000;

    for buffer_size in [1, 50, MAX_BUFFER_SIZE] {
        group.throughput(Throughput::Elements(records as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(buffer_size),
            &buffer_size,
            |b, &buffer_size| {
                b.to_async(&runtime).iter_batched(
                    || seeded_stream(1, records),
                    |stream| async move {
                        let partition = stream.partition_ids()[0].clone();
                        let shutdown = CancellationToken::new();
                        let handler =
                            Arc::new(CountingHandler::new(records, shutdown.clone()));
                        let worker = PartitionWorker::new(
                            partition,
                            Arc::new(config(buffer_size)),
                            stream,
                            Arc::new(MemoryCheckpoint::new("bench", "bench")),
                            handler,
                        );
                        black_box(worker.run(shutdown).await.unwrap());
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

/// Benchmark the consumer fanning out across partitions
fn bench_consumer_partitions(c: &mut Criterion) {
    let mut group = c.benchmark_group("consumer_partitions");
    let runtime = Runtime::new().unwrap();
    let per_partition = 2_000;

    for partitions in [1, 4, 16] {
        let total = partitions * per_partition;
        group.throughput(Throughput::Elements(total as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(partitions),
            &partitions,
            |b, &partitions| {
                b.to_async(&runtime).iter_batched(
                    || seeded_stream(partitions, per_partition),
                    |stream| async move {
                        let shutdown = CancellationToken::new();
                        let handler = CountingHandler::new(total, shutdown.clone());
                        let checkpoints = Arc::new(MemoryCheckpoint::new("bench", "bench"));
                        let handle = StreamConsumer::new(config(100), stream, checkpoints)
                            .start_with_shutdown(handler, shutdown)
                            .await
                            .unwrap();
                        black_box(handle.join().await);
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_buffer_fill,
    bench_worker_buffer_sizes,
    bench_consumer_partitions
);
criterion_main!(benches);
