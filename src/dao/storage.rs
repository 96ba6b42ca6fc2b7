use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by snapshot stores regardless of the underlying medium.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The medium could not be read or written.
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A stored document could not be decoded or encoded.
    #[error("corrupt snapshot `{document}`")]
    Corrupt {
        document: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a corruption error for `document`.
    pub fn corrupt(document: impl Into<String>, source: serde_json::Error) -> Self {
        StorageError::Corrupt {
            document: document.into(),
            source,
        }
    }
}
