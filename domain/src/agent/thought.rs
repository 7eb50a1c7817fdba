//! Thinking-phase output.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::ValidationError;

/// Structured analysis of the user's instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thought {
    /// What the agent believes the user wants
    pub understanding: String,
    /// Concrete requirements extracted from the instruction
    #[serde(default)]
    pub requirements: Vec<String>,
    /// Points the agent is unsure about
    #[serde(default)]
    pub uncertainties: Vec<String>,
    /// Chosen high-level approach
    pub approach: String,
    /// The instruction cannot be acted on without asking the user
    #[serde(default)]
    pub needs_more_info: bool,
    /// Question to surface when `needs_more_info` is true
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarification_question: Option<String>,
}

impl Thought {
    /// Decodes model output, checking every required field explicitly.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let obj = value
            .as_object()
            .ok_or(ValidationError::NotAnObject("thought"))?;

        let understanding = obj
            .get("understanding")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingField("understanding"))?
            .to_string();

        let approach = obj
            .get("approach")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingField("approach"))?
            .to_string();

        let requirements = string_array(obj.get("requirements"));
        let uncertainties = string_array(obj.get("uncertainties"));

        let needs_more_info = obj
            .get("needsMoreInfo")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let clarification_question = obj
            .get("clarificationQuestion")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);

        // A clarification request without a question would dead-end the user.
        if needs_more_info && clarification_question.is_none() {
            return Err(ValidationError::MissingClarification);
        }

        Ok(Self {
            understanding,
            requirements,
            uncertainties,
            approach,
            needs_more_info,
            clarification_question,
        })
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
