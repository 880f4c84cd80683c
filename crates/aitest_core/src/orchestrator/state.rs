//! Workflow states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a run in the automation workflow.
///
/// States only move forward, one step at a time; any state may move to
/// [`WorkflowState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorkflowState {
    #[default]
    Idle,
    Connected,
    VideoConfigured,
    ModelHostConfigured,
    ModelLoaded,
    Measuring,
    Stopped,
    ResultFetched,
    Failed,
}

impl WorkflowState {
    /// The state that follows this one on success.
    pub fn next(&self) -> Option<WorkflowState> {
        match self {
            WorkflowState::Idle => Some(WorkflowState::Connected),
            WorkflowState::Connected => Some(WorkflowState::VideoConfigured),
            WorkflowState::VideoConfigured => Some(WorkflowState::ModelHostConfigured),
            WorkflowState::ModelHostConfigured => Some(WorkflowState::ModelLoaded),
            WorkflowState::ModelLoaded => Some(WorkflowState::Measuring),
            WorkflowState::Measuring => Some(WorkflowState::Stopped),
            WorkflowState::Stopped => Some(WorkflowState::ResultFetched),
            WorkflowState::ResultFetched | WorkflowState::Failed => None,
        }
    }

    /// Whether the workflow ended, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::ResultFetched | WorkflowState::Failed)
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Connected => "connected",
            WorkflowState::VideoConfigured => "video configured",
            WorkflowState::ModelHostConfigured => "model host configured",
            WorkflowState::ModelLoaded => "model loaded",
            WorkflowState::Measuring => "measuring",
            WorkflowState::Stopped => "stopped",
            WorkflowState::ResultFetched => "result fetched",
            WorkflowState::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
