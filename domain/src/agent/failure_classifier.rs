//! Non-recoverable failure classification.
//!
//! When a tool failure references an entity id that does not exist in the
//! current editor context, another iteration cannot fix it: the agent would
//! just retry the same impossible operation. The classifier scans failure
//! messages and step arguments for entity ids and reports the first one the
//! context does not know about.

use serde_json::{Map, Value};

use crate::context::EditorContext;

const ENTITY_PREFIXES: [&str; 3] = ["clip", "track", "asset"];

/// Finds an entity id referenced by a failed step that the context has never
/// seen. `None` means the failure may still be recoverable.
pub fn find_missing_entity(
    message: &str,
    args: &Map<String, Value>,
    context: &EditorContext,
) -> Option<String> {
    // Step arguments name entities precisely, so check them first.
    let mut candidates = Vec::new();
    collect_from_args(args, &mut candidates);
    for id in &candidates {
        if !context.knows_entity(id) {
            return Some(id.clone());
        }
    }

    for token in message.split(|c: char| c.is_whitespace() || "\"'`,.;:()[]{}".contains(c)) {
        if looks_like_entity_id(token) && !context.knows_entity(token) {
            return Some(token.to_string());
        }
    }

    None
}

fn collect_from_args(args: &Map<String, Value>, out: &mut Vec<String>) {
    for value in args.values() {
        collect_from_value(value, out);
    }
}

fn collect_from_value(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) if looks_like_entity_id(s) => out.push(s.clone()),
        Value::Object(obj) => collect_from_args(obj, out),
        Value::Array(items) => {
            for item in items {
                collect_from_value(item, out);
            }
        }
        _ => {}
    }
}

/// Whether a token has the shape of an entity id (`clip-…`, `track_…`, …).
fn looks_like_entity_id(token: &str) -> bool {
    ENTITY_PREFIXES.iter().any(|prefix| {
        token
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix(['-', '_']))
            .is_some_and(|rest| !rest.is_empty())
    })
}
