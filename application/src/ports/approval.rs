//! Approval port
//!
//! Plans that trip the guardrail policy pause the run until an injected
//! decision function approves or denies them.

use async_trait::async_trait;
use montage_domain::Plan;
use thiserror::Error;

/// The approval handler itself failed (distinct from a denial)
#[derive(Error, Debug)]
pub enum ApprovalError {
    #[error("Approval handler failed: {0}")]
    HandlerFailed(String),
}

/// Port for plan approval decisions
#[async_trait]
pub trait ApprovalPort: Send + Sync {
    /// Decide whether the plan may execute.
    ///
    /// `Ok(false)` is a denial, which ends the run as denied rather than
    /// failed. `Err` is a handler failure, which fails the run.
    async fn decide(&self, plan: &Plan) -> Result<bool, ApprovalError>;
}

/// Approves every plan. Suitable for headless or scripted runs.
pub struct AutoApprove;

#[async_trait]
impl ApprovalPort for AutoApprove {
    async fn decide(&self, _plan: &Plan) -> Result<bool, ApprovalError> {
        Ok(true)
    }
}

/// Denies every plan that reaches the approval gate.
pub struct AutoReject;

#[async_trait]
impl ApprovalPort for AutoReject {
    async fn decide(&self, _plan: &Plan) -> Result<bool, ApprovalError> {
        Ok(false)
    }
}
