pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::CheckpointError;
pub use file::FileCheckpoint;
pub use memory::MemoryCheckpoint;
pub use traits::{CheckpointKey, CheckpointStore};
