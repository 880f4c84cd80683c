//! RPC error types.

use thiserror::Error;

/// Errors raised by remote calls.
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Unable to connect to {endpoint}: {message}")]
    Connection { endpoint: String, message: String },

    #[error("RPC {operation} timed out")]
    Timeout { operation: String },

    #[error("RPC {operation} failed: server unavailable ({detail})")]
    Unavailable { operation: String, detail: String },

    #[error("RPC {operation} failed: not implemented by server ({detail})")]
    Unimplemented { operation: String, detail: String },

    #[error("RPC {operation} failed unexpectedly: {detail}")]
    Unexpected { operation: String, detail: String },

    #[error("Failed to start RPC runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl RpcError {
    /// Create a connection error.
    pub fn connection(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create an unexpected-failure error.
    pub fn unexpected(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Unexpected {
            operation: operation.into(),
            detail: detail.into(),
        }
    }
}

/// Result type for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;
