//! Engine lifecycle events.
//!
//! Every observable transition in a run is reported as an [`EngineEvent`].
//! Events are serialized with a `type` tag so frontends can dispatch on a
//! single discriminant field.

use serde::{Deserialize, Serialize};

use crate::agent::SessionSummary;

/// Progress marker for a single plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepProgress {
    Started,
    Completed,
    Failed,
}

/// Event emitted by the engine during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    SessionStart {
        session_id: String,
        instruction: String,
    },
    ThinkingStart,
    ThinkingComplete {
        understanding: String,
        needs_more_info: bool,
    },
    PlanningStart,
    PlanningComplete {
        goal: String,
        step_count: usize,
        requires_approval: bool,
        fast_path: bool,
    },
    ApprovalRequired {
        goal: String,
        step_count: usize,
    },
    ApprovalResponse {
        approved: bool,
    },
    ExecutionStart {
        step_count: usize,
    },
    ExecutionProgress {
        step_id: String,
        status: StepProgress,
        /// Fraction of plan steps finished, in [0, 1]
        completion: f64,
    },
    ExecutionComplete {
        succeeded: usize,
        failed: usize,
    },
    /// A tool refused to run because the external system denied permission
    ToolPermissionRequired {
        step_id: String,
        tool: String,
    },
    RollbackComplete {
        attempted_count: usize,
        succeeded_count: usize,
    },
    ObservationComplete {
        goal_achieved: bool,
        needs_iteration: bool,
    },
    IterationComplete {
        iteration: u32,
    },
    ClarificationRequired {
        question: String,
    },
    DoomLoopDetected {
        entity_id: String,
    },
    SessionComplete {
        summary: SessionSummary,
    },
    SessionFailed {
        error: String,
    },
    SessionAborted,
}
