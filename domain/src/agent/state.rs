//! Engine session state and lifecycle.

use serde::{Deserialize, Serialize};

use crate::agent::observation::Observation;
use crate::agent::plan::Plan;
use crate::agent::thought::Thought;
use crate::context::EditorContext;
use crate::core::string::current_timestamp_ms;
use crate::tool::ToolExecutionResult;

/// Phase of the engine state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    Idle,
    Thinking,
    Planning,
    AwaitingApproval,
    Executing,
    Observing,
    Completed,
    Failed,
    Aborted,
}

impl EnginePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnginePhase::Idle => "idle",
            EnginePhase::Thinking => "thinking",
            EnginePhase::Planning => "planning",
            EnginePhase::AwaitingApproval => "awaiting_approval",
            EnginePhase::Executing => "executing",
            EnginePhase::Observing => "observing",
            EnginePhase::Completed => "completed",
            EnginePhase::Failed => "failed",
            EnginePhase::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EnginePhase::Completed | EnginePhase::Failed | EnginePhase::Aborted
        )
    }
}

impl std::fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Record of one executed step, kept for rollback and observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub step_id: String,
    pub tool: String,
    pub result: ToolExecutionResult,
    pub timestamp_ms: u64,
}

impl ExecutionRecord {
    pub fn new(step_id: impl Into<String>, result: ToolExecutionResult) -> Self {
        Self {
            step_id: step_id.into(),
            tool: result.tool_name.clone(),
            result,
            timestamp_ms: current_timestamp_ms(),
        }
    }
}

/// Final report handed back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub iterations: u32,
    pub steps_executed: usize,
    pub steps_succeeded: usize,
    pub steps_failed: usize,
    pub duration_ms: u64,
    pub final_phase: String,
}

/// Outcome of a rollback attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackReport {
    /// Whether rollback was attempted at all
    pub attempted: bool,
    /// Why rollback ran (or was skipped)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub attempted_count: usize,
    pub succeeded_count: usize,
    /// Step ids whose undo failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

/// Mutable state of one agent session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub session_id: String,
    pub phase: EnginePhase,
    /// Completed think/plan/execute/observe cycles
    pub iteration: u32,
    pub context: EditorContext,
    pub thought: Option<Thought>,
    pub plan: Option<Plan>,
    pub last_observation: Option<Observation>,
    /// Every executed step across all iterations, in completion order
    pub execution_history: Vec<ExecutionRecord>,
    /// Undo outcome of the most recent failed execution, if any
    pub rollback: Option<RollbackReport>,
    pub error: Option<String>,
    pub started_at_ms: u64,
    pub completed_at_ms: Option<u64>,
}

impl AgentState {
    pub fn new(session_id: impl Into<String>, context: EditorContext) -> Self {
        Self {
            session_id: session_id.into(),
            phase: EnginePhase::Idle,
            iteration: 0,
            context,
            thought: None,
            plan: None,
            last_observation: None,
            execution_history: Vec::new(),
            rollback: None,
            error: None,
            started_at_ms: current_timestamp_ms(),
            completed_at_ms: None,
        }
    }

    pub fn transition_to(&mut self, phase: EnginePhase) {
        self.phase = phase;
    }

    /// Starts the next iteration. Returns false when the budget is spent.
    pub fn increment_iteration(&mut self, max_iterations: u32) -> bool {
        if self.iteration >= max_iterations {
            return false;
        }
        self.iteration += 1;
        true
    }

    pub fn record_execution(&mut self, record: ExecutionRecord) {
        self.execution_history.push(record);
    }

    pub fn complete(&mut self) {
        self.phase = EnginePhase::Completed;
        self.finalize();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.phase = EnginePhase::Failed;
        self.error = Some(error.into());
        self.finalize();
    }

    pub fn abort(&mut self) {
        self.phase = EnginePhase::Aborted;
        self.finalize();
    }

    // completed_at_ms is set once; later terminal transitions keep the first.
    fn finalize(&mut self) {
        if self.completed_at_ms.is_none() {
            self.completed_at_ms = Some(current_timestamp_ms());
        }
    }

    pub fn summary(&self) -> SessionSummary {
        let steps_succeeded = self
            .execution_history
            .iter()
            .filter(|r| r.result.success)
            .count();
        let duration_ms = self
            .completed_at_ms
            .unwrap_or_else(current_timestamp_ms)
            .saturating_sub(self.started_at_ms);

        SessionSummary {
            session_id: self.session_id.clone(),
            iterations: self.iteration,
            steps_executed: self.execution_history.len(),
            steps_succeeded,
            steps_failed: self.execution_history.len() - steps_succeeded,
            duration_ms,
            final_phase: self.phase.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolError;

    #[test]
    fn test_terminal_phases() {
        assert!(EnginePhase::Completed.is_terminal());
        assert!(EnginePhase::Failed.is_terminal());
        assert!(EnginePhase::Aborted.is_terminal());
        assert!(!EnginePhase::Executing.is_terminal());
    }

    #[test]
    fn test_iteration_budget() {
        let mut state = AgentState::new("s-1", EditorContext::new());
        assert!(state.increment_iteration(2));
        assert!(state.increment_iteration(2));
        assert!(!state.increment_iteration(2));
        assert_eq!(state.iteration, 2);
    }

    #[test]
    fn test_finalize_once() {
        let mut state = AgentState::new("s-1", EditorContext::new());
        state.fail("boom");
        let first = state.completed_at_ms;
        state.abort();
        assert_eq!(state.completed_at_ms, first);
        assert_eq!(state.phase, EnginePhase::Aborted);
    }

    #[test]
    fn test_summary_counts() {
        let mut state = AgentState::new("s-1", EditorContext::new());
        state.record_execution(ExecutionRecord::new(
            "step-1",
            ToolExecutionResult::success("split_clip"),
        ));
        state.record_execution(ExecutionRecord::new(
            "step-2",
            ToolExecutionResult::failure("delete_clip", ToolError::not_found("gone")),
        ));
        state.complete();

        let summary = state.summary();
        assert_eq!(summary.steps_executed, 2);
        assert_eq!(summary.steps_succeeded, 1);
        assert_eq!(summary.steps_failed, 1);
        assert_eq!(summary.final_phase, "completed");
    }
}
