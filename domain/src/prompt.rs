//! Prompt templates for the agent phases.

use crate::agent::plan::Plan;
use crate::agent::state::ExecutionRecord;
use crate::agent::thought::Thought;
use crate::context::EditorContext;
use crate::session::Message;
use crate::tool::ToolDescriptor;

/// Templates for generating agent prompts
pub struct EnginePromptTemplate;

impl EnginePromptTemplate {
    /// System prompt shared by every phase.
    pub fn system(context: &EditorContext, tools: &[ToolDescriptor]) -> String {
        let tool_descriptions = tools
            .iter()
            .map(|t| format!("- **{}**: {} (risk: {})", t.name, t.description, t.risk_level))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are a video editing assistant that translates user instructions into editor tool invocations.

## Editor State

{context}

## Available Tools

{tool_descriptions}

## Guidelines

1. Operate only on clips, tracks and assets that exist in the editor state
2. Prefer the smallest sequence of operations that satisfies the instruction
3. Destructive operations (deletions) must be explicit, never incidental
4. If the instruction is ambiguous, ask rather than guess
"#,
            context = context.to_prompt_context(),
            tool_descriptions = tool_descriptions
        )
    }

    /// Prompt for the thinking phase.
    pub fn thinking(instruction: &str, history: &[Message]) -> String {
        let history_info = if history.is_empty() {
            String::new()
        } else {
            let turns = history
                .iter()
                .map(|m| format!("[{:?}] {}", m.role, m.content))
                .collect::<Vec<_>>()
                .join("\n");
            format!("\n\n## Conversation So Far\n\n{}", turns)
        };

        format!(
            r#"## Task

Analyze the user's instruction before planning any edits.{history_info}

## User Instruction

{instruction}

## Instructions

Respond with a JSON object of this shape:

```json
{{
  "understanding": "What the user wants, in one or two sentences",
  "requirements": ["concrete requirement"],
  "uncertainties": ["anything you are unsure about"],
  "approach": "High-level approach to satisfy the instruction",
  "needsMoreInfo": false,
  "clarificationQuestion": "Only when needsMoreInfo is true"
}}
```

Set `needsMoreInfo` to true only when the instruction cannot be acted on
safely without an answer from the user, and then always include a
`clarificationQuestion`."#,
            history_info = history_info,
            instruction = instruction
        )
    }

    /// Prompt for the planning phase.
    pub fn planning(thought: &Thought, tools: &[ToolDescriptor]) -> String {
        let tool_names = tools
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            r#"## Task

Turn the analysis below into an ordered execution plan.

## Analysis

**Understanding**: {understanding}

**Approach**: {approach}

## Instructions

Respond with a JSON object of this shape:

```json
{{
  "goal": "What the plan accomplishes",
  "steps": [
    {{
      "id": "step-1",
      "tool": "one of: {tool_names}",
      "args": {{ "clipId": "clip-1" }},
      "description": "What this step does",
      "riskLevel": "low | medium | high | critical",
      "estimatedDurationMs": 500,
      "dependsOn": []
    }}
  ],
  "rollbackStrategy": "undo_completed_steps"
}}
```

Rules:
- Step ids must be unique; `dependsOn` may only name earlier steps
- To consume a value produced by an earlier step, use
  `{{ "$fromStep": "step-1", "$path": "data.fieldName" }}` as the argument
- Use only entity ids present in the editor state
- Keep the plan minimal"#,
            understanding = thought.understanding,
            approach = thought.approach,
            tool_names = tool_names
        )
    }

    /// Prompt for the observing phase.
    pub fn observing(plan: &Plan, history: &[ExecutionRecord]) -> String {
        let results_summary = history
            .iter()
            .map(|record| {
                let outcome = if record.result.success {
                    "Success".to_string()
                } else {
                    format!(
                        "Failed: {}",
                        record
                            .result
                            .error
                            .as_ref()
                            .map(|e| e.message.as_str())
                            .unwrap_or("unknown error")
                    )
                };
                let effects = if record.result.side_effects.is_empty() {
                    String::new()
                } else {
                    format!(" — {}", record.result.side_effects.join("; "))
                };
                format!("- {} [{}]{}", record.step_id, outcome, effects)
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"## Task

Assess whether the executed plan achieved its goal.

## Goal

{goal}

## Execution Results

{results_summary}

## Instructions

Respond with a JSON object of this shape:

```json
{{
  "goalAchieved": true,
  "stateChanges": ["observed change"],
  "summary": "One-line outcome",
  "confidence": 0.9,
  "needsIteration": false,
  "iterationReason": "Only when needsIteration is true"
}}
```

Request another iteration only when further tool calls could plausibly
close the gap between the results and the goal."#,
            goal = plan.goal,
            results_summary = results_summary
        )
    }
}
