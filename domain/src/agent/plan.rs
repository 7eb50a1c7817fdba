//! Planning-phase output: validated, bounded step sequences.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::agent::guardrail::RiskLevel;
use crate::core::error::ValidationError;

/// How execution failures are unwound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStrategy {
    /// Reverse completed steps via their recorded undo operations
    UndoCompletedSteps,
    /// Leave partial results in place
    None,
}

/// One tool invocation within a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    /// Unique id within the plan
    pub id: String,
    /// Tool to invoke
    pub tool: String,
    /// Arguments, possibly containing step-value references
    pub args: Map<String, Value>,
    /// Human-readable description of what this step does
    pub description: String,
    /// Declared risk of this step
    pub risk_level: RiskLevel,
    /// Estimated duration
    pub estimated_duration_ms: u64,
    /// Ids of earlier steps this one consumes results from
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Hint that this step has no ordering constraint with its neighbors
    #[serde(default)]
    pub parallelizable: bool,
}

/// A validated execution plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Restatement of what the plan accomplishes
    pub goal: String,
    /// Ordered steps
    pub steps: Vec<PlanStep>,
    /// Sum of step estimates
    pub estimated_total_duration_ms: u64,
    /// Set by the guardrail policy after validation
    pub requires_approval: bool,
    /// Failure handling for this plan
    pub rollback_strategy: RollbackStrategy,
}

impl Plan {
    /// Builds a single-step plan (used by the deterministic fast path).
    pub fn single_step(goal: impl Into<String>, step: PlanStep) -> Self {
        let estimated = step.estimated_duration_ms;
        Self {
            goal: goal.into(),
            steps: vec![step],
            estimated_total_duration_ms: estimated,
            requires_approval: false,
            rollback_strategy: RollbackStrategy::UndoCompletedSteps,
        }
    }

    /// Checks structural invariants: non-empty, unique step ids, and
    /// dependencies that point only at earlier steps.
    ///
    /// Forward-only dependencies make cycles impossible by construction, so
    /// no separate cycle check is needed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.steps.is_empty() {
            return Err(ValidationError::EmptyPlan);
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for step in &self.steps {
            for dep in &step.depends_on {
                if !seen.contains(dep.as_str()) {
                    return Err(ValidationError::DanglingDependency {
                        step: step.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
            if !seen.insert(step.id.as_str()) {
                return Err(ValidationError::DuplicateStepId(step.id.clone()));
            }
        }

        Ok(())
    }

    /// Decodes model output into a plan, checking required fields explicitly.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let obj = value
            .as_object()
            .ok_or(ValidationError::NotAnObject("plan"))?;

        let goal = obj
            .get("goal")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingField("goal"))?
            .to_string();

        let raw_steps = obj
            .get("steps")
            .and_then(Value::as_array)
            .ok_or(ValidationError::MissingField("steps"))?;

        let mut steps = Vec::with_capacity(raw_steps.len());
        for raw in raw_steps {
            steps.push(PlanStep::from_json(raw)?);
        }

        let estimated_total_duration_ms = obj
            .get("estimatedTotalDurationMs")
            .and_then(Value::as_u64)
            .unwrap_or_else(|| steps.iter().map(|s| s.estimated_duration_ms).sum());

        let rollback_strategy = match obj.get("rollbackStrategy").and_then(Value::as_str) {
            Some("none") => RollbackStrategy::None,
            _ => RollbackStrategy::UndoCompletedSteps,
        };

        let plan = Self {
            goal,
            steps,
            estimated_total_duration_ms,
            // requires_approval is a policy decision, never trusted from the
            // model. The guardrail sets it after validation.
            requires_approval: false,
            rollback_strategy,
        };
        plan.validate()?;
        Ok(plan)
    }
}

impl PlanStep {
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let obj = value
            .as_object()
            .ok_or(ValidationError::NotAnObject("plan step"))?;

        let id = obj
            .get("id")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingField("id"))?
            .to_string();

        let tool = obj
            .get("tool")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingField("tool"))?
            .to_string();

        let args = obj
            .get("args")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let description = obj
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let risk_level = match obj.get("riskLevel").and_then(Value::as_str) {
            Some(raw) => RiskLevel::parse(raw).ok_or(ValidationError::InvalidField {
                field: "riskLevel",
                reason: format!("unknown risk level `{}`", raw),
            })?,
            None => RiskLevel::Medium,
        };

        let estimated_duration_ms = obj
            .get("estimatedDurationMs")
            .and_then(Value::as_u64)
            .unwrap_or(1_000);

        let depends_on = obj
            .get("dependsOn")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let parallelizable = obj
            .get("parallelizable")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(Self {
            id,
            tool,
            args,
            description,
            risk_level,
            estimated_duration_ms,
            depends_on,
            parallelizable,
        })
    }
}
