//! Tool invocation entities and results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agent::RiskLevel;

/// A single invocation of an editor tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    /// Name of the tool to invoke (e.g. `split_clip`)
    pub tool_name: String,
    /// Arguments in the tool's wire format
    pub arguments: Map<String, Value>,
    /// Why the agent chose this invocation, if recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: Map::new(),
            reasoning: None,
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Returns the argument `key` as a string, if present and a string.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// Machine-readable failure reported by a tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolError {
    /// Stable error code (e.g. `NOT_FOUND`, `TIMEOUT`)
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Optional structured detail payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("INVALID_ARGUMENT", message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new("PERMISSION_DENIED", message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new("EXECUTION_FAILED", message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new("TIMEOUT", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new("UNAVAILABLE", message)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Whether retrying the same invocation could plausibly succeed.
    ///
    /// Only infrastructure failures are transient. A missing clip or a bad
    /// argument will not fix itself on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self.code.as_str(), "TIMEOUT" | "UNAVAILABLE")
    }
}

/// Outcome of a single tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecutionResult {
    /// The tool that ran
    pub tool_name: String,
    /// Whether the invocation succeeded
    pub success: bool,
    /// Structured result payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure detail when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    /// Wall-clock duration of the invocation
    pub duration_ms: u64,
    /// Human-readable descriptions of project mutations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub side_effects: Vec<String>,
    /// Whether the mutation can be reversed
    #[serde(default)]
    pub undoable: bool,
    /// Invocation that reverses this one, when undoable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undo_operation: Option<ToolCall>,
}

impl ToolExecutionResult {
    pub fn success(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            data: None,
            error: None,
            duration_ms: 0,
            side_effects: Vec::new(),
            undoable: false,
            undo_operation: None,
        }
    }

    pub fn failure(tool_name: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            data: None,
            error: Some(error),
            duration_ms: 0,
            side_effects: Vec::new(),
            undoable: false,
            undo_operation: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_side_effect(mut self, effect: impl Into<String>) -> Self {
        self.side_effects.push(effect.into());
        self
    }

    /// Marks the result undoable and records the reversing invocation.
    pub fn with_undo(mut self, undo: ToolCall) -> Self {
        self.undoable = true;
        self.undo_operation = Some(undo);
        self
    }

    /// Whether this failure is worth retrying.
    pub fn is_transient_failure(&self) -> bool {
        !self.success && self.error.as_ref().is_some_and(ToolError::is_transient)
    }
}

/// Tool metadata surfaced to the planner prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub risk_level: RiskLevel,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        risk_level: RiskLevel,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            risk_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_call_builder() {
        let call = ToolCall::new("split_clip")
            .with_arg("clipId", "clip-1")
            .with_arg("atTimelineSec", 4.5);

        assert_eq!(call.tool_name, "split_clip");
        assert_eq!(call.get_string("clipId"), Some("clip-1"));
        assert_eq!(call.arguments["atTimelineSec"], json!(4.5));
    }

    #[test]
    fn test_transient_codes() {
        assert!(ToolError::timeout("t").is_transient());
        assert!(ToolError::unavailable("u").is_transient());
        assert!(!ToolError::not_found("n").is_transient());
        assert!(!ToolError::invalid_argument("i").is_transient());
        assert!(!ToolError::permission_denied("p").is_transient());
        assert!(!ToolError::execution_failed("e").is_transient());
    }

    #[test]
    fn test_result_success_with_undo() {
        let result = ToolExecutionResult::success("delete_clip")
            .with_side_effect("Removed clip-1 from track-video-1")
            .with_undo(ToolCall::new("insert_clip").with_arg("assetId", "asset-3"));

        assert!(result.success);
        assert!(result.undoable);
        assert_eq!(
            result.undo_operation.as_ref().unwrap().tool_name,
            "insert_clip"
        );
    }

    #[test]
    fn test_result_transient_failure() {
        let result = ToolExecutionResult::failure("split_clip", ToolError::timeout("slow"));
        assert!(result.is_transient_failure());

        let result = ToolExecutionResult::failure("split_clip", ToolError::not_found("gone"));
        assert!(!result.is_transient_failure());
    }

    #[test]
    fn test_result_wire_format_is_camel_case() {
        let result = ToolExecutionResult::success("split_clip").with_duration(12);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["toolName"], "split_clip");
        assert_eq!(json["durationMs"], 12);
    }
}
