//! Shared utilities for use cases.
//!
//! Contains cancellation checking and the timeout-raced structured
//! generation helper used by the thinking, planning, and observing phases.

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::ports::llm_gateway::{LlmGateway, StructuredRequest};
use crate::use_cases::types::EngineError;

/// Check if cancellation has been requested.
///
/// Returns `Err(EngineError::Cancelled)` if the token is cancelled.
pub(crate) fn check_cancelled(token: &CancellationToken) -> Result<(), EngineError> {
    if token.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    Ok(())
}

/// Request structured output, racing the call against its phase timeout and
/// the cancellation token.
///
/// On timeout the in-flight generation is aborted before the phase-specific
/// timeout error is raised; on cancellation likewise.
pub(crate) async fn generate_structured_cancellable<G: LlmGateway>(
    gateway: &G,
    request: StructuredRequest,
    timeout: Duration,
    phase: &'static str,
    cancel: &CancellationToken,
) -> Result<Value, EngineError> {
    check_cancelled(cancel)?;

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            gateway.abort();
            Err(EngineError::Cancelled)
        }
        _ = tokio::time::sleep(timeout) => {
            gateway.abort();
            Err(EngineError::PhaseTimeout { phase })
        }
        result = gateway.generate_structured(request) => {
            Ok(result?)
        }
    }
}
