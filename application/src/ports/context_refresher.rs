//! Context refresher port
//!
//! The editor state drifts as steps execute, so the engine re-reads it at
//! the top of every iteration. Refresh failures are tolerated: the run
//! continues with the previous snapshot rather than aborting.

use async_trait::async_trait;
use montage_domain::EditorContext;
use thiserror::Error;

/// The editor state could not be read
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("Editor state unavailable: {0}")]
    Unavailable(String),
}

/// Port for re-reading the current editor state
#[async_trait]
pub trait ContextRefresherPort: Send + Sync {
    async fn refresh(&self) -> Result<EditorContext, RefreshError>;
}

/// Refresher that always returns the same snapshot (tests, previews)
pub struct StaticContextRefresher {
    context: EditorContext,
}

impl StaticContextRefresher {
    pub fn new(context: EditorContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl ContextRefresherPort for StaticContextRefresher {
    async fn refresh(&self) -> Result<EditorContext, RefreshError> {
        Ok(self.context.clone())
    }
}
