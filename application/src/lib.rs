//! Application layer for the montage editing agent
//!
//! Orchestrates the think/plan/execute/observe loop around the domain types,
//! speaking to the outside world only through ports:
//!
//! - [`ports::llm_gateway::LlmGateway`]: structured model generation
//! - [`ports::tool_executor::ToolExecutorPort`]: editor tool invocation
//! - [`ports::approval::ApprovalPort`]: the human approval gate
//! - [`ports::memory_store::MemoryStorePort`]: cross-session memory
//! - [`ports::context_refresher::ContextRefresherPort`]: fresh editor state
//! - [`ports::event_sink::EngineEventSink`]: progress reporting
//!
//! The entry point is [`AgenticEngine::run`], which takes one instruction to
//! a terminal [`RunOutcome`].

pub mod config;
pub mod ports;
pub mod use_cases;

pub use config::EngineConfig;
pub use ports::approval::{ApprovalError, ApprovalPort, AutoApprove, AutoReject};
pub use ports::checkpoint::{CheckpointError, CheckpointStorePort, NullCheckpointStore};
pub use ports::context_refresher::{ContextRefresherPort, RefreshError, StaticContextRefresher};
pub use ports::event_sink::{EngineEventSink, NullEventSink};
pub use ports::llm_gateway::{GatewayError, LlmGateway, StructuredRequest};
pub use ports::memory_store::{MemoryStorePort, NullMemoryStore};
pub use ports::tool_executor::ToolExecutorPort;
pub use use_cases::run_session::AgenticEngine;
pub use use_cases::types::{EngineError, RunInput, RunOutcome, RunOutput};
