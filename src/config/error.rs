use thiserror::Error;

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Buffer size must be between 1 and {max}, got {value}")]
    InvalidBufferSize { value: usize, max: usize },

    #[error("Invalid duration for {0}")]
    InvalidDuration(&'static str),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}
