pub mod consumer;
pub mod error;
pub mod retry;

// Re-export commonly used types
pub use consumer::{ConsumerConfig, MAX_BUFFER_SIZE};
pub use error::ConfigError;
pub use retry::RetryPolicy;
