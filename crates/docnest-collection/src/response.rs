use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, ErrorInfo};

/// Outcome of one collection operation: data or an error, never both.
///
/// Public collection methods always return a `Response`; they never panic
/// or return a bare `Result`. Callers check for an error before touching
/// the data. Serialized, a response is either `{"data": ...}` or
/// `{"error": ...}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[must_use]
pub enum Response<T> {
    Data(T),
    Error(ErrorInfo),
}

impl<T> Response<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Data(data) => Some(data),
            Self::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            Self::Data(_) => None,
            Self::Error(error) => Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns `true` if this is an error with the given code.
    pub fn is_error_code(&self, code: ErrorCode) -> bool {
        self.error().is_some_and(|e| e.is(code))
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Data(data) => Some(data),
            Self::Error(_) => None,
        }
    }

    pub fn into_result(self) -> Result<T, ErrorInfo> {
        self.into()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        match self {
            Self::Data(data) => Response::Data(f(data)),
            Self::Error(error) => Response::Error(error),
        }
    }
}

impl<T> From<Result<T, ErrorInfo>> for Response<T> {
    fn from(result: Result<T, ErrorInfo>) -> Self {
        match result {
            Ok(data) => Self::Data(data),
            Err(error) => Self::Error(error),
        }
    }
}

impl<T> From<Response<T>> for Result<T, ErrorInfo> {
    fn from(response: Response<T>) -> Self {
        match response {
            Response::Data(data) => Ok(data),
            Response::Error(error) => Err(error),
        }
    }
}
