//! Engine configuration.

use montage_domain::{GuardrailPolicy, RiskLevel};
use std::time::Duration;

/// Tunable parameters for the agentic engine.
///
/// Every field has a default; callers override only what they need via the
/// builder methods.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum think/plan/execute/observe cycles per run
    pub max_iterations: u32,
    /// Maximum steps a single plan may carry
    pub max_steps_per_run: usize,
    /// Maximum tool invocations (including retries) per run
    pub max_tool_calls_per_run: usize,
    /// Retries per step for transient tool failures
    pub max_retries: u32,
    /// Timeout for the thinking phase (structured generation is slow)
    pub thinking_timeout: Duration,
    /// Timeout for the planning phase
    pub planning_timeout: Duration,
    /// Timeout per tool invocation
    pub execution_timeout: Duration,
    /// Timeout for the observation phase
    pub observation_timeout: Duration,
    /// Steps at or above this risk level require approval
    pub approval_threshold: RiskLevel,
    /// Destructive tools require approval regardless of declared risk
    pub require_approval_for_destructive_actions: bool,
    /// Recognize simple commands without calling the model
    pub enable_fast_path: bool,
    /// Minimum confidence for a fast-path match to be used
    pub fast_path_confidence_threshold: f64,
    /// Undo completed steps when execution fails partway
    pub enable_auto_rollback_on_failure: bool,
    /// Skip all remaining steps after a fatal step failure
    pub stop_on_error: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            max_steps_per_run: 20,
            max_tool_calls_per_run: 50,
            max_retries: 2,
            thinking_timeout: Duration::from_secs(90),
            planning_timeout: Duration::from_secs(60),
            execution_timeout: Duration::from_secs(120),
            observation_timeout: Duration::from_secs(30),
            approval_threshold: RiskLevel::High,
            require_approval_for_destructive_actions: true,
            enable_fast_path: true,
            fast_path_confidence_threshold: 0.8,
            enable_auto_rollback_on_failure: true,
            stop_on_error: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_steps_per_run(mut self, max: usize) -> Self {
        self.max_steps_per_run = max;
        self
    }

    pub fn with_max_tool_calls_per_run(mut self, max: usize) -> Self {
        self.max_tool_calls_per_run = max;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_approval_threshold(mut self, threshold: RiskLevel) -> Self {
        self.approval_threshold = threshold;
        self
    }

    pub fn without_fast_path(mut self) -> Self {
        self.enable_fast_path = false;
        self
    }

    pub fn without_auto_rollback(mut self) -> Self {
        self.enable_auto_rollback_on_failure = false;
        self
    }

    /// The guardrail policy implied by this configuration.
    pub fn guardrail(&self) -> GuardrailPolicy {
        GuardrailPolicy::new()
            .with_approval_threshold(self.approval_threshold)
            .with_destructive_approval(self.require_approval_for_destructive_actions)
            .with_max_steps_per_run(self.max_steps_per_run)
            .with_max_tool_calls_per_run(self.max_tool_calls_per_run)
    }
}
