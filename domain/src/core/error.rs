//! Domain error types

use thiserror::Error;

/// Errors produced while decoding structured model output into domain types.
///
/// Structured generation returns schema-shaped JSON, but the model is not a
/// trusted serializer: every required field is checked explicitly and a
/// tagged error is produced instead of a generic deserialization panic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Expected a JSON object for {0}")]
    NotAnObject(&'static str),

    #[error("Missing required field `{0}`")]
    MissingField(&'static str),

    #[error("Field `{field}` is invalid: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error("Duplicate step id `{0}`")]
    DuplicateStepId(String),

    #[error("Step `{step}` depends on `{dependency}`, which is not an earlier step")]
    DanglingDependency { step: String, dependency: String },

    #[error("Plan contains no steps")]
    EmptyPlan,

    #[error("Thought requires more info but has no clarification question")]
    MissingClarification,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ValidationError::MissingField("goal");
        assert_eq!(err.to_string(), "Missing required field `goal`");

        let err = ValidationError::DanglingDependency {
            step: "s2".to_string(),
            dependency: "s9".to_string(),
        };
        assert!(err.to_string().contains("s2"));
        assert!(err.to_string().contains("s9"));
    }
}
