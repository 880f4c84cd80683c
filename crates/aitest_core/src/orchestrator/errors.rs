//! Error types for the automation workflow.
//!
//! Errors carry the name of the step that failed:
//! Workflow → Step → Layer error → Detail

use thiserror::Error;

use crate::config::ConfigError;
use crate::process::ProcessError;
use crate::rpc::RpcError;

use super::state::WorkflowState;

/// Error that moved the workflow to `Failed`.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Configuration was invalid for the step.
    #[error("Step '{step}' failed: {source}")]
    Config {
        step: String,
        #[source]
        source: ConfigError,
    },

    /// An external process could not be launched.
    #[error("Step '{step}' failed: {source}")]
    Process {
        step: String,
        #[source]
        source: ProcessError,
    },

    /// A remote call failed.
    #[error("Step '{step}' failed: {source}")]
    Rpc {
        step: String,
        #[source]
        source: RpcError,
    },

    /// A step was requested out of order.
    #[error("Step '{step}' is not allowed while {from} (requires {expected})")]
    InvalidTransition {
        step: String,
        from: WorkflowState,
        expected: WorkflowState,
    },

    /// The operator interrupted the run.
    #[error("Workflow interrupted during '{step}'")]
    Interrupted { step: String },
}

impl WorkflowError {
    /// Create a configuration error for a step.
    pub fn config(step: impl Into<String>, source: ConfigError) -> Self {
        Self::Config {
            step: step.into(),
            source,
        }
    }

    /// Create a process error for a step.
    pub fn process(step: impl Into<String>, source: ProcessError) -> Self {
        Self::Process {
            step: step.into(),
            source,
        }
    }

    /// Create an RPC error for a step.
    pub fn rpc(step: impl Into<String>, source: RpcError) -> Self {
        Self::Rpc {
            step: step.into(),
            source,
        }
    }

    /// Create an interrupted error.
    pub fn interrupted(step: impl Into<String>) -> Self {
        Self::Interrupted { step: step.into() }
    }

    /// Whether the operator interrupted the run.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, WorkflowError::Interrupted { .. })
    }

    /// Name of the failing step.
    pub fn step(&self) -> &str {
        match self {
            WorkflowError::Config { step, .. }
            | WorkflowError::Process { step, .. }
            | WorkflowError::Rpc { step, .. }
            | WorkflowError::InvalidTransition { step, .. }
            | WorkflowError::Interrupted { step } => step,
        }
    }
}

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;
