use bytes::Bytes;

use super::sequence::SequenceNumber;

/// Immutable unit read from a stream partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    data: Bytes,
    sequence_number: SequenceNumber,
    partition_key: String,
}

impl Record {
    pub fn new(
        data: impl Into<Bytes>,
        sequence_number: impl Into<SequenceNumber>,
        partition_key: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            sequence_number: sequence_number.into(),
            partition_key: partition_key.into(),
        }
    }

    /// Opaque payload bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn sequence_number(&self) -> &SequenceNumber {
        &self.sequence_number
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }
}
