pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::BackendError;
pub use memory::MemoryStream;
pub use traits::{PollOutput, StreamBackend};
