use super::record::Record;
use super::sequence::{PartitionId, SequenceNumber};

/// Per-partition accumulator of records awaiting a flush
///
/// Owned by exactly one partition worker. Appends are unchecked; the worker
/// consults [`Buffer::should_flush`] after every append and flushes before
/// adding more, so the count never exceeds the capacity between flushes.
#[derive(Debug, Clone)]
pub struct Buffer {
    partition_id: PartitionId,
    max_record_count: usize,
    records: Vec<Record>,
}

impl Buffer {
    /// Create an empty buffer for a partition
    pub fn new(partition_id: PartitionId, max_record_count: usize) -> Self {
        Self {
            partition_id,
            max_record_count,
            records: Vec::with_capacity(max_record_count),
        }
    }

    /// Append a record (stream order is preserved)
    pub fn add_record(&mut self, record: Record) {
        self.records.push(record);
    }

    /// True once the record count has reached the capacity
    pub fn should_flush(&self) -> bool {
        self.records.len() >= self.max_record_count
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Buffered records in stream order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn partition_id(&self) -> &PartitionId {
        &self.partition_id
    }

    pub fn max_record_count(&self) -> usize {
        self.max_record_count
    }

    pub fn first_sequence(&self) -> Option<&SequenceNumber> {
        self.records.first().map(Record::sequence_number)
    }

    /// Sequence of the most recently appended record
    pub fn last_sequence(&self) -> Option<&SequenceNumber> {
        self.records.last().map(Record::sequence_number)
    }

    /// Drop all buffered records, keeping partition and capacity
    pub fn flush(&mut self) {
        self.records.clear();
    }
}
