//! Type definitions for the engine run use case.

use crate::ports::llm_gateway::GatewayError;
use montage_domain::{
    AgentState, BudgetBreach, EditorContext, ExecutionContext, Message, SessionSummary,
    ValidationError,
};
use thiserror::Error;

/// Errors that can occur during an engine run
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("A session is already active")]
    SessionActive,

    #[error("The {phase} phase timed out")]
    PhaseTimeout { phase: &'static str },

    #[error("Budget exceeded: {0}")]
    Budget(#[from] BudgetBreach),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Max iterations exceeded")]
    MaxIterationsExceeded,

    #[error("Approval handler failed: {0}")]
    ApprovalFailed(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}

/// Input for an engine run
#[derive(Debug, Clone)]
pub struct RunInput {
    /// The user's natural-language instruction
    pub instruction: String,
    /// Snapshot of the editor state at run start
    pub context: EditorContext,
    /// Target project/sequence for tool invocations
    pub execution: ExecutionContext,
    /// Earlier conversation turns, if any
    pub history: Vec<Message>,
}

impl RunInput {
    pub fn new(instruction: impl Into<String>, context: EditorContext) -> Self {
        Self {
            instruction: instruction.into(),
            context,
            execution: ExecutionContext::default(),
            history: Vec::new(),
        }
    }

    pub fn with_execution(mut self, execution: ExecutionContext) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }
}

/// How a run ended.
///
/// Denials and clarification requests are distinct incomplete outcomes, not
/// failures; aborts are never conflated with failures either.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The observer confirmed the goal was achieved
    Completed,
    /// The instruction cannot be acted on without an answer from the user
    ClarificationNeeded { question: String },
    /// The approval gate denied the plan
    ApprovalDenied,
    /// The run hit an error
    Failed { error: String },
    /// The run was cancelled via `abort()`
    Aborted,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

/// Output from an engine run
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Final state of the session
    pub state: AgentState,
    /// Aggregated run statistics
    pub summary: SessionSummary,
    /// How the run ended
    pub outcome: RunOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_cancelled() {
        let error = EngineError::Cancelled;
        assert_eq!(error.to_string(), "Operation cancelled");
        assert!(error.is_cancelled());
    }

    #[test]
    fn test_is_cancelled_false_for_other_errors() {
        let errors = vec![
            EngineError::SessionActive,
            EngineError::MaxIterationsExceeded,
            EngineError::PhaseTimeout { phase: "thinking" },
        ];

        for error in errors {
            assert!(!error.is_cancelled(), "{:?} should not be cancelled", error);
        }
    }

    #[test]
    fn test_outcome_success() {
        assert!(RunOutcome::Completed.is_success());
        assert!(!RunOutcome::ApprovalDenied.is_success());
        assert!(
            !RunOutcome::Failed {
                error: "x".to_string()
            }
            .is_success()
        );
    }
}
