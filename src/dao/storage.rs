use thiserror::Error;

/// Result alias for snapshot store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by snapshot store backends regardless of the underlying medium.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage location could not be read or written.
    #[error("snapshot io failure: {message}")]
    Io {
        /// Human-readable description of the attempted operation.
        message: String,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// The snapshot document could not be encoded or decoded.
    #[error("snapshot codec failure")]
    Codec {
        /// Underlying serde error.
        #[from]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Wrap an io error with context about the attempted operation.
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            message: message.into(),
            source,
        }
    }
}
