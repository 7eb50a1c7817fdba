//! Step-value references.
//!
//! Plan steps may consume values produced by earlier steps without the model
//! knowing them in advance. An argument of the shape
//! `{ "$fromStep": "step-1", "$path": "data.rightClipId" }` is replaced at
//! execution time by the value found at that dotted path in the referenced
//! step's result.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

use crate::tool::ToolExecutionResult;

const FROM_STEP_KEY: &str = "$fromStep";
const PATH_KEY: &str = "$path";

/// A reference to a value produced by an earlier step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepValueReference {
    #[serde(rename = "$fromStep")]
    pub from_step: String,
    #[serde(rename = "$path")]
    pub path: String,
}

/// Reference resolution failures. These are plan defects, not transient
/// conditions, so they are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Reference targets unknown step `{0}`")]
    UnknownStep(String),

    #[error("Reference targets step `{0}`, which did not succeed")]
    StepNotSuccessful(String),

    #[error("Path `{path}` not found in result of step `{step}`")]
    MissingPath { step: String, path: String },
}

/// Interprets a JSON value as a step-value reference, if it has the shape.
pub fn reference_in(value: &Value) -> Option<StepValueReference> {
    let obj = value.as_object()?;
    let from_step = obj.get(FROM_STEP_KEY)?.as_str()?;
    let path = obj.get(PATH_KEY)?.as_str()?;
    Some(StepValueReference {
        from_step: from_step.to_string(),
        path: path.to_string(),
    })
}

/// Resolves every reference in `args` against completed step results.
///
/// Recurses into nested objects and arrays so references can appear at any
/// depth. Non-reference values pass through unchanged.
pub fn resolve_args(
    args: &Map<String, Value>,
    results: &HashMap<String, ToolExecutionResult>,
) -> Result<Map<String, Value>, ResolveError> {
    let mut resolved = Map::with_capacity(args.len());
    for (key, value) in args {
        resolved.insert(key.clone(), resolve_value(value, results)?);
    }
    Ok(resolved)
}

fn resolve_value(
    value: &Value,
    results: &HashMap<String, ToolExecutionResult>,
) -> Result<Value, ResolveError> {
    if let Some(reference) = reference_in(value) {
        return resolve_reference(&reference, results);
    }

    match value {
        Value::Object(obj) => {
            let mut out = Map::with_capacity(obj.len());
            for (k, v) in obj {
                out.insert(k.clone(), resolve_value(v, results)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(resolve_value(item, results)?);
            }
            Ok(Value::Array(out))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_reference(
    reference: &StepValueReference,
    results: &HashMap<String, ToolExecutionResult>,
) -> Result<Value, ResolveError> {
    let result = results
        .get(&reference.from_step)
        .ok_or_else(|| ResolveError::UnknownStep(reference.from_step.clone()))?;

    if !result.success {
        return Err(ResolveError::StepNotSuccessful(reference.from_step.clone()));
    }

    // Paths are looked up against the serialized result, so `data.rightClipId`
    // and top-level fields like `durationMs` both work.
    let root = serde_json::to_value(result).unwrap_or(Value::Null);
    lookup_path(&root, &reference.path).ok_or_else(|| ResolveError::MissingPath {
        step: reference.from_step.clone(),
        path: reference.path.clone(),
    })
}

fn lookup_path(root: &Value, path: &str) -> Option<Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(obj) => obj.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn results_with(step_id: &str, result: ToolExecutionResult) -> HashMap<String, ToolExecutionResult> {
        let mut map = HashMap::new();
        map.insert(step_id.to_string(), result);
        map
    }

    #[test]
    fn test_reference_shape_detection() {
        assert!(reference_in(&json!({ "$fromStep": "s1", "$path": "data.x" })).is_some());
        assert!(reference_in(&json!({ "$fromStep": "s1" })).is_none());
        assert!(reference_in(&json!("clip-1")).is_none());
        assert!(reference_in(&json!({ "clipId": "clip-1" })).is_none());
    }

    #[test]
    fn test_resolve_nested_data_path() {
        let result = ToolExecutionResult::success("split_clip")
            .with_data(json!({ "rightClipId": "clip-1b" }));
        let results = results_with("step-1", result);

        let mut args = Map::new();
        args.insert(
            "clipId".to_string(),
            json!({ "$fromStep": "step-1", "$path": "data.rightClipId" }),
        );

        let resolved = resolve_args(&args, &results).unwrap();
        assert_eq!(resolved["clipId"], json!("clip-1b"));
    }

    #[test]
    fn test_resolve_inside_array_and_nested_object() {
        let result = ToolExecutionResult::success("split_clip")
            .with_data(json!({ "parts": ["clip-1a", "clip-1b"] }));
        let results = results_with("step-1", result);

        let mut args = Map::new();
        args.insert(
            "selection".to_string(),
            json!({
                "clips": [{ "$fromStep": "step-1", "$path": "data.parts.1" }]
            }),
        );

        let resolved = resolve_args(&args, &results).unwrap();
        assert_eq!(resolved["selection"]["clips"][0], json!("clip-1b"));
    }

    #[test]
    fn test_unknown_step_fails() {
        let results = HashMap::new();
        let mut args = Map::new();
        args.insert(
            "clipId".to_string(),
            json!({ "$fromStep": "step-9", "$path": "data.x" }),
        );
        assert_eq!(
            resolve_args(&args, &results),
            Err(ResolveError::UnknownStep("step-9".to_string()))
        );
    }

    #[test]
    fn test_failed_step_cannot_be_referenced() {
        let result = ToolExecutionResult::failure(
            "split_clip",
            crate::tool::ToolError::not_found("gone"),
        );
        let results = results_with("step-1", result);

        let mut args = Map::new();
        args.insert(
            "clipId".to_string(),
            json!({ "$fromStep": "step-1", "$path": "data.x" }),
        );
        assert_eq!(
            resolve_args(&args, &results),
            Err(ResolveError::StepNotSuccessful("step-1".to_string()))
        );
    }

    #[test]
    fn test_missing_path_fails() {
        let result = ToolExecutionResult::success("split_clip").with_data(json!({ "a": 1 }));
        let results = results_with("step-1", result);

        let mut args = Map::new();
        args.insert(
            "clipId".to_string(),
            json!({ "$fromStep": "step-1", "$path": "data.missing" }),
        );
        assert!(matches!(
            resolve_args(&args, &results),
            Err(ResolveError::MissingPath { .. })
        ));
    }

    #[test]
    fn test_plain_values_pass_through() {
        let results = HashMap::new();
        let mut args = Map::new();
        args.insert("clipId".to_string(), json!("clip-1"));
        args.insert("atTimelineSec".to_string(), json!(4.5));

        let resolved = resolve_args(&args, &results).unwrap();
        assert_eq!(resolved["clipId"], json!("clip-1"));
        assert_eq!(resolved["atTimelineSec"], json!(4.5));
    }
}
