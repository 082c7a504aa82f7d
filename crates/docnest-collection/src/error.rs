//! Error taxonomy for collection operations.
//!
//! Every failed operation carries an [`ErrorInfo`] with one of a closed set
//! of [`ErrorCode`]s. [`ErrorGenerator`] builds them with consistent
//! messages that name the collection and document involved.

use std::fmt;
use std::sync::Arc;

use docnest_store::StoreError;
use docnest_types::TypeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kind of failure an operation reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// Unexpected failure not covered by another code.
    #[serde(rename = "internal-error")]
    Internal = 1,
    /// The document could not be fetched, or does not exist.
    NotFound,
    NotSaved,
    NotDeleted,
    /// Identifiers or the ancestor chain were rejected before any driver call.
    InvalidParameters,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal-error",
            Self::NotFound => "not-found",
            Self::NotSaved => "not-saved",
            Self::NotDeleted => "not-deleted",
            Self::InvalidParameters => "invalid-parameters",
        }
    }

    /// Stable numeric form of the code.
    pub fn number(&self) -> u16 {
        *self as u16
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed operation.
///
/// Immutable once built. The driver failure that caused it, if any, is
/// kept as [`std::error::Error::source`].
#[derive(Clone, Debug, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ErrorInfo {
    code: ErrorCode,
    message: String,
    /// Offending parameter names, for [`ErrorCode::InvalidParameters`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    parameters: Vec<String>,
    #[source]
    #[serde(skip)]
    cause: Option<Arc<StoreError>>,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>, cause: Option<StoreError>) -> Self {
        Self {
            code,
            message: message.into(),
            parameters: Vec::new(),
            cause: cause.map(Arc::new),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn cause(&self) -> Option<&StoreError> {
        self.cause.as_deref()
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }
}

/// Builders for every [`ErrorInfo`] the collection layer reports.
pub struct ErrorGenerator;

impl ErrorGenerator {
    pub fn internal_error(cause: Option<StoreError>) -> ErrorInfo {
        ErrorInfo::new(ErrorCode::Internal, "Internal server error", cause)
    }

    pub fn document_not_found(collection: &str, id: &str, cause: Option<StoreError>) -> ErrorInfo {
        ErrorInfo::new(
            ErrorCode::NotFound,
            format!("Error getting document id \"{id}\" from \"{collection}\" collection"),
            cause,
        )
    }

    pub fn document_not_saved(collection: &str, id: &str, cause: Option<StoreError>) -> ErrorInfo {
        ErrorInfo::new(
            ErrorCode::NotSaved,
            format!("Error storing document id \"{id}\" on \"{collection}\" collection"),
            cause,
        )
    }

    pub fn document_not_deleted(
        collection: &str,
        id: &str,
        cause: Option<StoreError>,
    ) -> ErrorInfo {
        ErrorInfo::new(
            ErrorCode::NotDeleted,
            format!("Error deleting document id \"{id}\" from \"{collection}\" collection"),
            cause,
        )
    }

    /// `parameters` names every rejected parameter; `reason` says why.
    pub fn invalid_parameters<S: Into<String>>(
        parameters: impl IntoIterator<Item = S>,
        reason: impl fmt::Display,
    ) -> ErrorInfo {
        let parameters: Vec<String> = parameters.into_iter().map(Into::into).collect();
        let mut info = ErrorInfo::new(
            ErrorCode::InvalidParameters,
            format!("Invalid parameters [{}]: {reason}", parameters.join(", ")),
            None,
        );
        info.parameters = parameters;
        info
    }

    pub fn missing_ancestor(collection: &str, ancestor: &str) -> ErrorInfo {
        Self::invalid_parameters(
            [ancestor],
            format_args!("id of parent collection \"{ancestor}\" not set for \"{collection}\""),
        )
    }

    pub fn missing_id(collection: &str) -> ErrorInfo {
        Self::invalid_parameters(
            ["id"],
            format_args!("a document id is required on \"{collection}\""),
        )
    }

    /// A segment that failed path validation.
    pub fn invalid_segment(parameter: &str, error: &TypeError) -> ErrorInfo {
        Self::invalid_parameters([parameter], error)
    }
}

/// Errors from building a collection [`Hierarchy`](crate::Hierarchy).
#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("invalid collection: {0}")]
    InvalidName(#[from] TypeError),

    #[error("collection declared twice: {0}")]
    Duplicate(String),

    #[error("collection {name} names undeclared parent {parent}")]
    UnknownParent { name: String, parent: String },

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("collection {0} is a root collection")]
    NotNested(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
