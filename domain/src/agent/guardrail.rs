//! Guardrail policy: risk classification, approval gating, and budgets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::plan::{Plan, PlanStep};

/// Risk classification for a tool or plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Parses the wire form, tolerating case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            "critical" => Some(RiskLevel::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A budget was exhausted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BudgetBreach {
    #[error("Plan has {steps} steps, exceeding the per-run limit of {max}")]
    StepBudget { steps: usize, max: usize },

    #[error("Run has used {calls} tool calls and hit the per-run limit of {max}")]
    ToolCallBudget { calls: usize, max: usize },
}

/// Static safety policy applied to every plan before execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailPolicy {
    /// Steps at or above this risk level require user approval
    pub approval_threshold: RiskLevel,
    /// Destructive tools require approval regardless of declared risk
    pub require_approval_for_destructive_actions: bool,
    /// Maximum steps a single plan may carry
    pub max_steps_per_run: usize,
    /// Maximum tool invocations (including retries and rollback) per run
    pub max_tool_calls_per_run: usize,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self {
            approval_threshold: RiskLevel::High,
            require_approval_for_destructive_actions: true,
            max_steps_per_run: 20,
            max_tool_calls_per_run: 50,
        }
    }
}

impl GuardrailPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_approval_threshold(mut self, threshold: RiskLevel) -> Self {
        self.approval_threshold = threshold;
        self
    }

    pub fn with_destructive_approval(mut self, required: bool) -> Self {
        self.require_approval_for_destructive_actions = required;
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

    /// Whether a tool name denotes an operation that discards content.
    pub fn is_destructive(&self, tool_name: &str) -> bool {
        tool_name.starts_with("delete_")
            || tool_name.starts_with("remove_")
            || tool_name.starts_with("clear_")
    }

    /// Whether a single step requires approval under this policy.
    pub fn step_requires_approval(&self, step: &PlanStep) -> bool {
        if step.risk_level >= self.approval_threshold {
            return true;
        }
        self.require_approval_for_destructive_actions && self.is_destructive(&step.tool)
    }

    /// Whether the plan as a whole requires approval before execution.
    ///
    /// One gated step gates the entire plan. Partial approval is not a thing:
    /// the user approves or rejects the plan atomically.
    pub fn plan_requires_approval(&self, plan: &Plan) -> bool {
        plan.steps.iter().any(|s| self.step_requires_approval(s))
    }

    /// Checks the plan against the per-run step budget.
    pub fn check_step_budget(&self, plan: &Plan) -> Result<(), BudgetBreach> {
        if plan.steps.len() > self.max_steps_per_run {
            return Err(BudgetBreach::StepBudget {
                steps: plan.steps.len(),
                max: self.max_steps_per_run,
            });
        }
        Ok(())
    }
}

/// Counts tool invocations across a run, including retries and rollback.
#[derive(Debug, Clone)]
pub struct BudgetTracker {
    tool_calls: usize,
    max_tool_calls: usize,
}

impl BudgetTracker {
    pub fn new(max_tool_calls: usize) -> Self {
        Self {
            tool_calls: 0,
            max_tool_calls,
        }
    }

    /// Charges one tool invocation. Fails when the budget is exhausted,
    /// reporting the calls actually issued so far.
    pub fn charge(&mut self) -> Result<(), BudgetBreach> {
        if self.tool_calls >= self.max_tool_calls {
            return Err(BudgetBreach::ToolCallBudget {
                calls: self.tool_calls,
                max: self.max_tool_calls,
            });
        }
        self.tool_calls += 1;
        Ok(())
    }

    pub fn tool_calls(&self) -> usize {
        self.tool_calls
    }
}
