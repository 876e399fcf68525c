use std::fmt;

use super::sequence::SequenceNumber;

/// Opaque read position handed out by a stream backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CursorToken(String);

impl CursorToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CursorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a freshly requested cursor should point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPosition {
    /// Immediately after the given (already processed) sequence number
    AfterSequence(SequenceNumber),

    /// The oldest record the partition still retains
    OldestRetained,
}

impl fmt::Display for StartPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AfterSequence(seq) => write!(f, "after sequence {}", seq),
            Self::OldestRetained => f.write_str("oldest retained"),
        }
    }
}
