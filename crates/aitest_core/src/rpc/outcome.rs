//! Tagged result of a single remote call.

use tonic::{Code, Status};

use super::errors::{RpcError, RpcResult};

/// Outcome of one remote call.
///
/// Callers inspect the tag to decide on fallbacks; only
/// [`RpcOutcome::into_result`] turns a failure into an error.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcOutcome<T> {
    Success(T),
    Timeout,
    Unavailable(String),
    Unimplemented(String),
    Unexpected(String),
}

impl<T> RpcOutcome<T> {
    /// Classify a failed call by its status code.
    pub fn from_status(status: &Status) -> Self {
        let detail = status.message().to_string();
        match status.code() {
            Code::DeadlineExceeded => RpcOutcome::Timeout,
            Code::Unavailable => RpcOutcome::Unavailable(detail),
            Code::Unimplemented => RpcOutcome::Unimplemented(detail),
            code => RpcOutcome::Unexpected(format!("{:?}: {}", code, detail)),
        }
    }

    /// Whether the call succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, RpcOutcome::Success(_))
    }

    /// Whether the server does not implement the call.
    pub fn is_unimplemented(&self) -> bool {
        matches!(self, RpcOutcome::Unimplemented(_))
    }

    /// Transform the success payload.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RpcOutcome<U> {
        match self {
            RpcOutcome::Success(value) => RpcOutcome::Success(f(value)),
            RpcOutcome::Timeout => RpcOutcome::Timeout,
            RpcOutcome::Unavailable(d) => RpcOutcome::Unavailable(d),
            RpcOutcome::Unimplemented(d) => RpcOutcome::Unimplemented(d),
            RpcOutcome::Unexpected(d) => RpcOutcome::Unexpected(d),
        }
    }

    /// Short description of a failure, `None` on success.
    pub fn failure_detail(&self) -> Option<String> {
        match self {
            RpcOutcome::Success(_) => None,
            RpcOutcome::Timeout => Some("timed out".to_string()),
            RpcOutcome::Unavailable(d) => Some(format!("unavailable: {}", d)),
            RpcOutcome::Unimplemented(d) => Some(format!("unimplemented: {}", d)),
            RpcOutcome::Unexpected(d) => Some(d.clone()),
        }
    }

    /// Convert into a `Result`, naming `operation` in the error.
    pub fn into_result(self, operation: &str) -> RpcResult<T> {
        let operation = operation.to_string();
        match self {
            RpcOutcome::Success(value) => Ok(value),
            RpcOutcome::Timeout => Err(RpcError::Timeout { operation }),
            RpcOutcome::Unavailable(detail) => Err(RpcError::Unavailable { operation, detail }),
            RpcOutcome::Unimplemented(detail) => Err(RpcError::Unimplemented { operation, detail }),
            RpcOutcome::Unexpected(detail) => Err(RpcError::Unexpected { operation, detail }),
        }
    }
}
