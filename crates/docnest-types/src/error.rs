use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid collection name {name:?}: {reason}")]
    InvalidCollectionName { name: String, reason: String },

    #[error("invalid document id {id:?}: {reason}")]
    InvalidDocumentId { id: String, reason: String },

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
