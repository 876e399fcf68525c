pub mod buffer;
pub mod cursor;
pub mod record;
pub mod sequence;

// Re-export commonly used types
pub use buffer::Buffer;
pub use cursor::{CursorToken, StartPosition};
pub use record::Record;
pub use sequence::{PartitionId, SequenceNumber};
