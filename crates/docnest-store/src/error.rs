use docnest_types::DocumentPath;

/// Errors from driver operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A create-only write targeted a document that already exists.
    #[error("document already exists: {0}")]
    AlreadyExists(DocumentPath),

    /// Documents must be JSON objects.
    #[error("invalid document at {path}: {reason}")]
    InvalidDocument { path: DocumentPath, reason: String },

    /// The backend cannot serve requests right now.
    #[error("database unavailable: {0}")]
    Unavailable(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal failure (e.g. a poisoned lock).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias for driver operations.
pub type StoreResult<T> = Result<T, StoreError>;
