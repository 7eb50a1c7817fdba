//! Observation-phase output.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::ValidationError;

/// Assessment of execution results against the goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Whether the goal was accomplished
    pub goal_achieved: bool,
    /// Observed mutations to the project
    #[serde(default)]
    pub state_changes: Vec<String>,
    /// One-line summary of the outcome
    pub summary: String,
    /// Model confidence in this assessment, in [0, 1]
    pub confidence: f64,
    /// Whether another think/plan/execute iteration is warranted
    #[serde(default)]
    pub needs_iteration: bool,
    /// Why another iteration is needed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration_reason: Option<String>,
}

impl Observation {
    /// Decodes model output, checking required fields explicitly.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let obj = value
            .as_object()
            .ok_or(ValidationError::NotAnObject("observation"))?;

        let goal_achieved = obj
            .get("goalAchieved")
            .and_then(Value::as_bool)
            .ok_or(ValidationError::MissingField("goalAchieved"))?;

        let summary = obj
            .get("summary")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingField("summary"))?
            .to_string();

        let confidence = obj
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(0.5)
            .clamp(0.0, 1.0);

        let state_changes = obj
            .get("stateChanges")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let needs_iteration = obj
            .get("needsIteration")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let iteration_reason = obj
            .get("iterationReason")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            goal_achieved,
            state_changes,
            summary,
            confidence,
            needs_iteration,
            iteration_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_complete() {
        let value = json!({
            "goalAchieved": true,
            "stateChanges": ["clip-1 split into clip-1a and clip-1b"],
            "summary": "Split applied at 4.5s",
            "confidence": 0.92,
            "needsIteration": false
        });

        let obs = Observation::from_json(&value).unwrap();
        assert!(obs.goal_achieved);
        assert_eq!(obs.state_changes.len(), 1);
        assert!((obs.confidence - 0.92).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_json_missing_goal_achieved() {
        let value = json!({ "summary": "s" });
        assert_eq!(
            Observation::from_json(&value),
            Err(ValidationError::MissingField("goalAchieved"))
        );
    }

    #[test]
    fn test_confidence_is_clamped() {
        let value = json!({
            "goalAchieved": false,
            "summary": "s",
            "confidence": 1.7
        });
        let obs = Observation::from_json(&value).unwrap();
        assert_eq!(obs.confidence, 1.0);
    }
}
