//! Error types for checkpoint storage backends

use thiserror::Error;

/// Errors raised by checkpoint store implementations
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The requested checkpoint does not exist
    #[error("Checkpoint not found: {0}")]
    NotFound(String),

    /// The caller passed an invalid argument (empty task id, bad path)
    #[error("Invalid checkpoint request: {0}")]
    Invalid(String),

    /// Snapshot could not be serialized or deserialized
    #[error("Checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The underlying storage failed
    #[error("Checkpoint storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for CheckpointError {
    fn from(err: std::io::Error) -> Self {
        CheckpointError::Storage(err.to_string())
    }
}

/// Result type for checkpoint operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CheckpointError = io.into();
        assert!(matches!(err, CheckpointError::Storage(_)));
        assert!(err.to_string().contains("denied"));
    }
}
