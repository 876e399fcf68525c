use std::io;
use thiserror::Error;

/// Checkpoint storage errors
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("No checkpoint for {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt checkpoint data: {0}")]
    Corrupt(String),
}
