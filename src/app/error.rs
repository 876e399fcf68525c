use std::io;
use thiserror::Error;

use crate::backend::BackendError;
use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;
use crate::streaming::{StartupError, WorkerError};

/// Top-level application errors unifying all layer errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Startup error: {0}")]
    Startup(#[from] StartupError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PartitionId;

    #[test]
    fn error_display_formats_correctly() {
        assert_eq!(
            AppError::InvalidArguments("missing file".to_string()).to_string(),
            "Invalid arguments: missing file"
        );
        assert_eq!(
            AppError::from(ConfigError::MissingField("region")).to_string(),
            "Configuration error: Missing required field: region"
        );
    }

    #[test]
    fn io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_err = AppError::from(io_err);

        match app_err {
            AppError::Io(_) => {}
            _ => panic!("Expected Io error variant"),
        }
    }

    #[test]
    fn startup_error_conversion() {
        let startup = StartupError::ListPartitions {
            stream: "orders".to_string(),
            source: BackendError::StreamNotFound("orders".to_string()),
        };

        match AppError::from(startup) {
            AppError::Startup(StartupError::ListPartitions { .. }) => {}
            _ => panic!("Expected Startup error variant"),
        }
    }

    #[test]
    fn worker_error_conversion() {
        let worker = WorkerError::Panicked(PartitionId::from("shard-0"));

        match AppError::from(worker) {
            AppError::Worker(WorkerError::Panicked(p)) => assert_eq!(p.as_str(), "shard-0"),
            _ => panic!("Expected Worker error variant"),
        }
    }
}
