use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::trace;

use super::error::BackendError;
use super::traits::{PollOutput, StreamBackend};
use crate::domain::{CursorToken, PartitionId, Record, SequenceNumber, StartPosition};

/// Upper bound on records returned by a single poll (matches the Kinesis GetRecords cap)
pub const DEFAULT_MAX_RECORDS_PER_POLL: usize = 10_000;

/// Retained records of one partition
#[derive(Debug)]
struct PartitionLog {
    records: Vec<Record>,
    /// Sequence assigned to the next appended record (sequences start at 1)
    next_sequence: u64,
}

impl PartitionLog {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            next_sequence: 1,
        }
    }

    /// Position of the oldest retained record, or the write head when empty
    fn oldest_position(&self) -> u64 {
        self.records
            .first()
            .and_then(|r| parse_sequence(r.sequence_number()))
            .unwrap_or(self.next_sequence)
    }
}

/// Decoded form of a cursor token issued by [`MemoryStream`]
struct CursorPosition {
    partition: PartitionId,
    position: u64,
    epoch: u64,
}

/// In-process partitioned stream
///
/// Sequences are decimal strings starting at `1` per partition. Every poll
/// mints a fresh cursor token, so a repeated token only appears when a caller
/// reuses one. [`MemoryStream::expire_cursors`] invalidates every token issued
/// so far, the way an iterator times out on a hosted stream.
pub struct MemoryStream {
    name: String,
    partition_ids: Vec<PartitionId>,
    partitions: DashMap<PartitionId, PartitionLog>,
    max_records_per_poll: usize,
    epoch: AtomicU64,
    serial: AtomicU64,
}

impl MemoryStream {
    /// Create a stream with `partition_count` partitions named `shardId-000000000000`, ...
    pub fn new(name: impl Into<String>, partition_count: usize) -> Self {
        let ids = (0..partition_count).map(|i| PartitionId::new(format!("shardId-{:012}", i)));
        Self::with_partitions(name, ids)
    }

    /// Create a stream with explicitly named partitions
    pub fn with_partitions(
        name: impl Into<String>,
        ids: impl IntoIterator<Item = PartitionId>,
    ) -> Self {
        let partition_ids: Vec<PartitionId> = ids.into_iter().collect();
        let partitions = DashMap::new();
        for id in &partition_ids {
            partitions.insert(id.clone(), PartitionLog::new());
        }

        Self {
            name: name.into(),
            partition_ids,
            partitions,
            max_records_per_poll: DEFAULT_MAX_RECORDS_PER_POLL,
            epoch: AtomicU64::new(0),
            serial: AtomicU64::new(0),
        }
    }

    /// Limit how many records a single poll returns
    pub fn with_max_records_per_poll(mut self, max: usize) -> Self {
        self.max_records_per_poll = max.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition_ids(&self) -> &[PartitionId] {
        &self.partition_ids
    }

    /// Append a record, routing it to a partition by hash of its key
    pub fn put_record(
        &self,
        data: impl Into<Bytes>,
        partition_key: &str,
    ) -> Result<(PartitionId, SequenceNumber), BackendError> {
        if self.partition_ids.is_empty() {
            return Err(BackendError::PartitionNotFound(partition_key.to_string()));
        }

        let mut hasher = DefaultHasher::new();
        partition_key.hash(&mut hasher);
        let idx = (hasher.finish() % self.partition_ids.len() as u64) as usize;
        let partition = self.partition_ids[idx].clone();

        let seq = self.put_record_to(&partition, data, partition_key)?;
        Ok((partition, seq))
    }

    /// Append a record to a specific partition
    pub fn put_record_to(
        &self,
        partition: &PartitionId,
        data: impl Into<Bytes>,
        partition_key: &str,
    ) -> Result<SequenceNumber, BackendError> {
        let mut log = self
            .partitions
            .get_mut(partition)
            .ok_or_else(|| BackendError::PartitionNotFound(partition.to_string()))?;

        let data: Bytes = data.into();
        let seq = SequenceNumber::from(log.next_sequence);
        log.next_sequence += 1;
        log.records.push(Record::new(data, seq.clone(), partition_key));

        Ok(seq)
    }

    /// Drop retained records with a sequence lower than `sequence`
    pub fn trim_before(
        &self,
        partition: &PartitionId,
        sequence: &SequenceNumber,
    ) -> Result<(), BackendError> {
        let mut log = self
            .partitions
            .get_mut(partition)
            .ok_or_else(|| BackendError::PartitionNotFound(partition.to_string()))?;

        log.records.retain(|r| r.sequence_number() >= sequence);
        Ok(())
    }

    /// Invalidate every cursor issued so far
    pub fn expire_cursors(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of records currently retained by a partition
    pub fn retained(&self, partition: &PartitionId) -> usize {
        self.partitions
            .get(partition)
            .map(|log| log.records.len())
            .unwrap_or(0)
    }

    fn check_stream(&self, stream: &str) -> Result<(), BackendError> {
        if stream == self.name {
            Ok(())
        } else {
            Err(BackendError::StreamNotFound(stream.to_string()))
        }
    }

    fn mint_cursor(&self, partition: &PartitionId, position: u64) -> CursorToken {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let serial = self.serial.fetch_add(1, Ordering::SeqCst);
        CursorToken::new(format!("{}/{}/{}/{}", partition, position, epoch, serial))
    }

    fn decode_cursor(cursor: &CursorToken) -> Result<CursorPosition, BackendError> {
        let invalid = || BackendError::InvalidCursor(cursor.to_string());

        // Partition ids may themselves contain '/', so split from the right
        let mut parts = cursor.as_str().rsplitn(4, '/');
        let _serial = parts.next().ok_or_else(invalid)?;
        let epoch = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(invalid)?;
        let position = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(invalid)?;
        let partition = parts.next().ok_or_else(invalid)?;

        Ok(CursorPosition {
            partition: PartitionId::from(partition),
            position,
            epoch,
        })
    }
}

fn parse_sequence(seq: &SequenceNumber) -> Option<u64> {
    seq.as_str().parse().ok()
}

#[async_trait]
impl StreamBackend for MemoryStream {
    async fn list_partitions(&self, stream: &str) -> Result<Vec<PartitionId>, BackendError> {
        self.check_stream(stream)?;
        Ok(self.partition_ids.clone())
    }

    async fn get_cursor(
        &self,
        stream: &str,
        partition: &PartitionId,
        position: &StartPosition,
    ) -> Result<CursorToken, BackendError> {
        self.check_stream(stream)?;

        let log = self
            .partitions
            .get(partition)
            .ok_or_else(|| BackendError::PartitionNotFound(partition.to_string()))?;
        let oldest = log.oldest_position();

        let start = match position {
            StartPosition::OldestRetained => oldest,
            StartPosition::AfterSequence(seq) => {
                let invalid = || BackendError::InvalidCursor(format!("sequence {}", seq));
                let after = parse_sequence(seq).ok_or_else(invalid)?;
                after.checked_add(1).ok_or_else(invalid)?.max(oldest)
            }
        };
        drop(log);

        Ok(self.mint_cursor(partition, start))
    }

    async fn poll(&self, cursor: &CursorToken) -> Result<PollOutput, BackendError> {
        let decoded = Self::decode_cursor(cursor)?;
        if decoded.epoch != self.epoch.load(Ordering::SeqCst) {
            return Err(BackendError::ExpiredCursor(cursor.to_string()));
        }

        let log = self
            .partitions
            .get(&decoded.partition)
            .ok_or_else(|| BackendError::PartitionNotFound(decoded.partition.to_string()))?;

        // Positions that fell behind retention resume at the oldest record
        let position = decoded.position.max(log.oldest_position());
        let records: Vec<Record> = log
            .records
            .iter()
            .filter(|r| parse_sequence(r.sequence_number()).is_some_and(|s| s >= position))
            .take(self.max_records_per_poll)
            .cloned()
            .collect();
        drop(log);

        let next_position = records
            .last()
            .and_then(|r| parse_sequence(r.sequence_number()))
            .map(|s| s.saturating_add(1))
            .unwrap_or(position);

        trace!(
            partition = %decoded.partition,
            position,
            count = records.len(),
            "memory stream poll"
        );

        Ok(PollOutput {
            records,
            next_cursor: Some(self.mint_cursor(&decoded.partition, next_position)),
        })
    }
}
