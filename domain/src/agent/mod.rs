//! Agent domain: thoughts, plans, observations, state, and policy.

pub mod failure_classifier;
pub mod fast_path;
pub mod guardrail;
pub mod observation;
pub mod plan;
pub mod reference;
pub mod state;
pub mod thought;

pub use failure_classifier::find_missing_entity;
pub use fast_path::{match_instruction, FastPathMatch};
pub use guardrail::{BudgetBreach, BudgetTracker, GuardrailPolicy, RiskLevel};
pub use observation::Observation;
pub use plan::{Plan, PlanStep, RollbackStrategy};
pub use reference::{reference_in, resolve_args, ResolveError, StepValueReference};
pub use state::{
    AgentState, EnginePhase, ExecutionRecord, RollbackReport, SessionSummary,
};
pub use thought::Thought;
