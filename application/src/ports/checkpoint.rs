//! Checkpoint store port
//!
//! Optional project snapshots around plan execution. Not required for
//! correctness; rollback works through per-step undo operations.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint creation failed: {0}")]
    CreateFailed(String),

    #[error("Checkpoint `{0}` not found")]
    NotFound(String),

    #[error("Restore failed: {0}")]
    RestoreFailed(String),
}

/// Port for project state snapshots
#[async_trait]
pub trait CheckpointStorePort: Send + Sync {
    /// Snapshot the project, returning a checkpoint id
    async fn create(&self, label: &str) -> Result<String, CheckpointError>;

    /// Restore a previously created snapshot
    async fn restore(&self, checkpoint_id: &str) -> Result<(), CheckpointError>;
}

/// Checkpoint store that snapshots nothing
pub struct NullCheckpointStore;

#[async_trait]
impl CheckpointStorePort for NullCheckpointStore {
    async fn create(&self, _label: &str) -> Result<String, CheckpointError> {
        Ok(String::new())
    }

    async fn restore(&self, _checkpoint_id: &str) -> Result<(), CheckpointError> {
        Ok(())
    }
}
