//! Ports (interfaces) consumed by the application layer.
//!
//! Implementations live outside this crate, following the dependency
//! inversion principle.

pub mod approval;
pub mod checkpoint;
pub mod context_refresher;
pub mod event_sink;
pub mod llm_gateway;
pub mod memory_store;
pub mod tool_executor;

pub use approval::{ApprovalError, ApprovalPort, AutoApprove, AutoReject};
pub use checkpoint::{CheckpointError, CheckpointStorePort, NullCheckpointStore};
pub use context_refresher::{ContextRefresherPort, RefreshError, StaticContextRefresher};
pub use event_sink::{EngineEventSink, NullEventSink};
pub use llm_gateway::{GatewayError, LlmGateway, StructuredRequest};
pub use memory_store::{MemoryStorePort, NullMemoryStore};
pub use tool_executor::ToolExecutorPort;
