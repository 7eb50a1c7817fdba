//! Use cases for the montage agent engine

pub mod execute_plan;
pub mod observe;
pub mod plan;
pub mod run_session;
pub mod shared;
pub mod think;
pub mod types;

pub use execute_plan::{ExecutePlanUseCase, ExecutionReport};
pub use observe::{Assessment, ObserveUseCase};
pub use plan::PlanUseCase;
pub use run_session::AgenticEngine;
pub use think::ThinkUseCase;
pub use types::{EngineError, RunInput, RunOutcome, RunOutput};
