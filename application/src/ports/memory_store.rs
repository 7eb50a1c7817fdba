//! Memory store port
//!
//! Long-lived preferences and operation history, used to hydrate the editor
//! context at run start and to record the chosen tools after a run.

use async_trait::async_trait;
use montage_domain::EditorContext;

/// Port for persistent agent memory
#[async_trait]
pub trait MemoryStorePort: Send + Sync {
    /// Adds remembered preferences and corrections to the context as notes
    async fn hydrate(&self, context: &mut EditorContext);

    /// Records that a tool was chosen for a completed run
    async fn record_tool_use(&self, tool_name: &str);

    /// Records a correction the user made to an agent decision
    async fn record_correction(&self, note: &str);
}

/// Memory store that remembers nothing
pub struct NullMemoryStore;

#[async_trait]
impl MemoryStorePort for NullMemoryStore {
    async fn hydrate(&self, _context: &mut EditorContext) {}

    async fn record_tool_use(&self, _tool_name: &str) {}

    async fn record_correction(&self, _note: &str) {}
}
