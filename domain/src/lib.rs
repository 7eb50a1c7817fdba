//! Domain layer for the montage editing agent
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Agent Loop
//!
//! A run turns one natural-language editing instruction into a bounded,
//! verified sequence of editor tool invocations:
//!
//! - **Think**: analyze the instruction against the current editor state
//! - **Plan**: produce an ordered, risk-classified step sequence
//! - **Execute**: invoke tools with budgets, retries, and rollback
//! - **Observe**: assess the results and decide whether to iterate
//!
//! ## Guardrails
//!
//! Every plan passes the same policy regardless of how it was produced:
//! risk-threshold approval gating, destructive-action gating, and per-run
//! step and tool-call budgets.

pub mod agent;
pub mod context;
pub mod core;
pub mod event;
pub mod prompt;
pub mod session;
pub mod tool;

// Re-export commonly used types
pub use agent::{
    failure_classifier::find_missing_entity,
    fast_path::{FastPathMatch, match_instruction},
    guardrail::{BudgetBreach, BudgetTracker, GuardrailPolicy, RiskLevel},
    observation::Observation,
    plan::{Plan, PlanStep, RollbackStrategy},
    reference::{ResolveError, StepValueReference, reference_in, resolve_args},
    state::{AgentState, EnginePhase, ExecutionRecord, RollbackReport, SessionSummary},
    thought::Thought,
};
pub use context::{EditorContext, ExecutionContext};
pub use crate::core::{error::ValidationError, string::current_timestamp_ms, string::truncate};
pub use event::{EngineEvent, StepProgress};
pub use prompt::EnginePromptTemplate;
pub use session::{Message, Role};
pub use tool::{ToolCall, ToolDescriptor, ToolError, ToolExecutionResult};
