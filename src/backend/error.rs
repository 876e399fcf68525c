use thiserror::Error;

/// Errors surfaced by a stream backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("Partition not found: {0}")]
    PartitionNotFound(String),

    #[error("Cursor expired: {0}")]
    ExpiredCursor(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// True when the cursor itself is unusable and must be re-derived
    pub fn is_cursor_error(&self) -> bool {
        matches!(self, Self::ExpiredCursor(_) | Self::InvalidCursor(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats_correctly() {
        assert_eq!(
            BackendError::StreamNotFound("orders".to_string()).to_string(),
            "Stream not found: orders"
        );
        assert_eq!(
            BackendError::ExpiredCursor("shard-0/3/1".to_string()).to_string(),
            "Cursor expired: shard-0/3/1"
        );
    }

    #[test]
    fn cursor_errors_are_classified() {
        assert!(BackendError::ExpiredCursor(String::new()).is_cursor_error());
        assert!(BackendError::InvalidCursor(String::new()).is_cursor_error());
        assert!(!BackendError::Unavailable(String::new()).is_cursor_error());
        assert!(!BackendError::PartitionNotFound(String::new()).is_cursor_error());
    }
}
