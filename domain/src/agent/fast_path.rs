//! Deterministic fast-path planner.
//!
//! A small library of command templates recognizes unambiguous editing
//! instructions ("split the selected clip at 4.5s") and synthesizes a
//! single-step plan without calling the language model. Matches carry a
//! confidence score; ambiguous or creative instructions produce no match
//! and fall back to model planning.

use serde_json::{json, Map, Value};

use crate::agent::guardrail::RiskLevel;
use crate::agent::plan::{Plan, PlanStep};
use crate::context::EditorContext;

/// A recognized command template instantiation.
#[derive(Debug, Clone)]
pub struct FastPathMatch {
    /// Template verb, used to namespace the step id
    pub verb: &'static str,
    pub tool: &'static str,
    pub args: Map<String, Value>,
    pub description: String,
    pub risk_level: RiskLevel,
    /// Match confidence in [0, 1]
    pub confidence: f64,
}

impl FastPathMatch {
    /// Materializes the match as a single-step plan.
    ///
    /// The step id carries the `fastpath-` namespace so downstream consumers
    /// can tell synthesized plans from model-produced ones.
    pub fn into_plan(self) -> Plan {
        let step = PlanStep {
            id: format!("fastpath-{}", self.verb),
            tool: self.tool.to_string(),
            args: self.args,
            description: self.description.clone(),
            risk_level: self.risk_level,
            estimated_duration_ms: 500,
            depends_on: Vec::new(),
            parallelizable: false,
        };
        Plan::single_step(self.description, step)
    }
}

/// Matches an instruction against the template library.
///
/// Returns `None` when no template fires; callers then take the model path.
pub fn match_instruction(instruction: &str, context: &EditorContext) -> Option<FastPathMatch> {
    let lower = instruction.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();

    // Creative or vague phrasing never short-circuits the model.
    if tokens.iter().any(|t| {
        matches!(
            *t,
            "feel" | "dramatic" | "better" | "nicer" | "cinematic" | "vibe" | "mood"
        )
    }) {
        return None;
    }

    if let Some(m) = match_split(&lower, &tokens, context) {
        return Some(m);
    }
    if let Some(m) = match_delete(&lower, context) {
        return Some(m);
    }
    if let Some(m) = match_trim(&lower, &tokens, context) {
        return Some(m);
    }
    if let Some(m) = match_move(&lower, &tokens, context) {
        return Some(m);
    }
    if let Some(m) = match_mute(&lower, context) {
        return Some(m);
    }

    None
}

fn match_split(lower: &str, tokens: &[&str], context: &EditorContext) -> Option<FastPathMatch> {
    if !lower.contains("split") {
        return None;
    }
    let clip_id = context.sole_selected_clip()?;

    // "at the playhead" or an explicit timestamp; nothing else qualifies.
    let (at_sec, confidence) = if lower.contains("playhead") {
        (context.playhead_sec, 0.95)
    } else if let Some(sec) = parse_seconds(tokens) {
        (sec, 1.0)
    } else {
        return None;
    };

    let mut args = Map::new();
    args.insert("clipId".to_string(), json!(clip_id));
    args.insert("atTimelineSec".to_string(), json!(at_sec));

    Some(FastPathMatch {
        verb: "split",
        tool: "split_clip",
        args,
        description: format!("Split {} at {:.2}s", clip_id, at_sec),
        risk_level: RiskLevel::Medium,
        confidence,
    })
}

fn match_delete(lower: &str, context: &EditorContext) -> Option<FastPathMatch> {
    if !(lower.contains("delete") || lower.contains("remove")) {
        return None;
    }
    if !(lower.contains("clip") || lower.contains("this") || lower.contains("it")) {
        return None;
    }
    let clip_id = context.sole_selected_clip()?;

    let mut args = Map::new();
    args.insert("clipId".to_string(), json!(clip_id));

    Some(FastPathMatch {
        verb: "delete",
        tool: "delete_clip",
        args,
        description: format!("Delete {}", clip_id),
        risk_level: RiskLevel::High,
        confidence: if lower.contains("clip") { 1.0 } else { 0.85 },
    })
}

fn match_trim(lower: &str, tokens: &[&str], context: &EditorContext) -> Option<FastPathMatch> {
    if !lower.contains("trim") {
        return None;
    }
    let clip_id = context.sole_selected_clip()?;
    let sec = parse_seconds(tokens)?;

    let mut args = Map::new();
    args.insert("clipId".to_string(), json!(clip_id));
    if lower.contains("start") || lower.contains("beginning") || lower.contains("head") {
        args.insert("newStart".to_string(), json!(sec));
    } else if lower.contains("end") || lower.contains("tail") {
        args.insert("newEnd".to_string(), json!(sec));
    } else {
        return None;
    }

    Some(FastPathMatch {
        verb: "trim",
        tool: "trim_clip",
        args,
        description: format!("Trim {} to {:.2}s", clip_id, sec),
        risk_level: RiskLevel::Medium,
        confidence: 0.9,
    })
}

fn match_move(lower: &str, tokens: &[&str], context: &EditorContext) -> Option<FastPathMatch> {
    if !lower.contains("move") {
        return None;
    }
    let clip_id = context.sole_selected_clip()?;
    let sec = parse_seconds(tokens)?;

    let mut args = Map::new();
    args.insert("clipId".to_string(), json!(clip_id));
    args.insert("newStart".to_string(), json!(sec));

    Some(FastPathMatch {
        verb: "move",
        tool: "move_clip",
        args,
        description: format!("Move {} to {:.2}s", clip_id, sec),
        risk_level: RiskLevel::Medium,
        confidence: 0.9,
    })
}

fn match_mute(lower: &str, context: &EditorContext) -> Option<FastPathMatch> {
    let muted = if lower.contains("unmute") {
        false
    } else if lower.contains("mute") {
        true
    } else {
        return None;
    };
    if !lower.contains("track") {
        return None;
    }
    let track_id = context.sole_selected_track()?;

    let mut args = Map::new();
    args.insert("trackId".to_string(), json!(track_id));
    args.insert("muted".to_string(), json!(muted));

    Some(FastPathMatch {
        verb: if muted { "mute" } else { "unmute" },
        tool: "set_track_muted",
        args,
        description: format!(
            "{} {}",
            if muted { "Mute" } else { "Unmute" },
            track_id
        ),
        risk_level: RiskLevel::Low,
        confidence: 1.0,
    })
}

/// Extracts a seconds value from tokens like `4.5s`, `4.5sec`, `at 4.5 seconds`.
fn parse_seconds(tokens: &[&str]) -> Option<f64> {
    for (i, token) in tokens.iter().enumerate() {
        let trimmed = token
            .trim_end_matches("seconds")
            .trim_end_matches("second")
            .trim_end_matches("secs")
            .trim_end_matches("sec")
            .trim_end_matches('s');
        if trimmed.is_empty() || trimmed == *token {
            // Bare number followed by a seconds word also counts.
            if let Ok(value) = token.parse::<f64>() {
                if matches!(
                    tokens.get(i + 1).copied(),
                    Some("s" | "sec" | "secs" | "second" | "seconds")
                ) {
                    return Some(value);
                }
            }
            continue;
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            return Some(value);
        }
    }
    None
}
