//! Plan use case
//!
//! Turns a [`Thought`] into a validated [`Plan`], either through the
//! deterministic fast path or through structured model generation. Both
//! paths pass the same guardrail classification.

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::ports::llm_gateway::{LlmGateway, StructuredRequest};
use crate::use_cases::shared::generate_structured_cancellable;
use crate::use_cases::types::EngineError;
use montage_domain::{
    match_instruction, EditorContext, EnginePromptTemplate, GuardrailPolicy, Message, Plan,
    Thought, ToolDescriptor,
};

/// Use case for the planning phase
pub struct PlanUseCase<'a, G: LlmGateway> {
    gateway: &'a G,
    config: &'a EngineConfig,
    guardrail: GuardrailPolicy,
    cancel: &'a CancellationToken,
}

impl<'a, G: LlmGateway> PlanUseCase<'a, G> {
    pub fn new(gateway: &'a G, config: &'a EngineConfig, cancel: &'a CancellationToken) -> Self {
        Self {
            gateway,
            config,
            guardrail: config.guardrail(),
            cancel,
        }
    }

    /// Attempts the deterministic fast path.
    ///
    /// Returns a validated plan when a command template matches at or above
    /// the confidence threshold, substituting the thinking and planning
    /// model calls. The plan still passes the same approval classification
    /// as any model-produced plan.
    pub fn try_fast_path(&self, instruction: &str, context: &EditorContext) -> Option<Plan> {
        if !self.config.enable_fast_path {
            return None;
        }
        let matched = match_instruction(instruction, context)?;
        if matched.confidence < self.config.fast_path_confidence_threshold {
            debug!(
                confidence = matched.confidence,
                "Fast-path match below confidence threshold, using model path"
            );
            return None;
        }

        info!(tool = matched.tool, "Fast path matched instruction");
        let mut plan = matched.into_plan();
        plan.requires_approval = self.guardrail.plan_requires_approval(&plan);
        Some(plan)
    }

    /// Requests a structured plan from the model and validates it.
    pub async fn execute_model(
        &self,
        thought: &Thought,
        context: &EditorContext,
        tools: &[ToolDescriptor],
    ) -> Result<Plan, EngineError> {
        let messages = vec![
            Message::system(EnginePromptTemplate::system(context, tools)),
            Message::user(EnginePromptTemplate::planning(thought, tools)),
        ];

        let request = StructuredRequest::new(messages, "plan", plan_schema());
        let value = generate_structured_cancellable(
            self.gateway,
            request,
            self.config.planning_timeout,
            "planning",
            self.cancel,
        )
        .await?;

        // from_json validates step id uniqueness and forward-only deps
        let mut plan = Plan::from_json(&value)?;
        plan.requires_approval = self.guardrail.plan_requires_approval(&plan);
        debug!(
            steps = plan.steps.len(),
            requires_approval = plan.requires_approval,
            "Planning complete: {}", plan.goal
        );
        Ok(plan)
    }
}

fn plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "goal": { "type": "string" },
            "steps": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "tool": { "type": "string" },
                        "args": { "type": "object" },
                        "description": { "type": "string" },
                        "riskLevel": { "enum": ["low", "medium", "high", "critical"] },
                        "estimatedDurationMs": { "type": "integer" },
                        "dependsOn": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": ["id", "tool"]
                }
            },
            "rollbackStrategy": { "enum": ["undo_completed_steps", "none"] }
        },
        "required": ["goal", "steps"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_gateway::GatewayError;
    use async_trait::async_trait;
    use montage_domain::RiskLevel;

    struct FixedGateway {
        value: Value,
    }

    #[async_trait]
    impl LlmGateway for FixedGateway {
        async fn generate_structured(
            &self,
            _request: StructuredRequest,
        ) -> Result<Value, GatewayError> {
            Ok(self.value.clone())
        }

        async fn complete(&self, _messages: &[Message]) -> Result<String, GatewayError> {
            Ok(String::new())
        }

        fn abort(&self) {}

        fn is_generating(&self) -> bool {
            false
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    fn selected_clip_context() -> EditorContext {
        EditorContext::new().with_selected_clip("clip-1")
    }

    #[tokio::test]
    async fn test_fast_path_plan_is_classified_by_guardrail() {
        let gateway = FixedGateway { value: json!({}) };
        let config = EngineConfig::default();
        let cancel = CancellationToken::new();
        let use_case = PlanUseCase::new(&gateway, &config, &cancel);

        // Deleting a clip is destructive, so even the fast path gates it.
        let plan = use_case
            .try_fast_path("delete the selected clip", &selected_clip_context())
            .expect("should match");
        assert!(plan.requires_approval);
        assert!(plan.steps[0].id.starts_with("fastpath-"));
    }

    #[tokio::test]
    async fn test_fast_path_respects_disable_flag() {
        let gateway = FixedGateway { value: json!({}) };
        let config = EngineConfig::default().without_fast_path();
        let cancel = CancellationToken::new();
        let use_case = PlanUseCase::new(&gateway, &config, &cancel);

        assert!(
            use_case
                .try_fast_path("delete the selected clip", &selected_clip_context())
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_model_plan_validation_failure() {
        // Duplicate step ids must be rejected
        let gateway = FixedGateway {
            value: json!({
                "goal": "g",
                "steps": [
                    { "id": "s1", "tool": "split_clip" },
                    { "id": "s1", "tool": "delete_clip" }
                ]
            }),
        };
        let config = EngineConfig::default();
        let cancel = CancellationToken::new();
        let use_case = PlanUseCase::new(&gateway, &config, &cancel);

        let thought = Thought {
            understanding: "u".to_string(),
            requirements: vec![],
            uncertainties: vec![],
            approach: "a".to_string(),
            needs_more_info: false,
            clarification_question: None,
        };
        let result = use_case
            .execute_model(&thought, &EditorContext::new(), &[])
            .await;
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn test_model_plan_gets_approval_classification() {
        let gateway = FixedGateway {
            value: json!({
                "goal": "delete it",
                "steps": [
                    { "id": "s1", "tool": "delete_clip", "riskLevel": "low" }
                ]
            }),
        };
        let config = EngineConfig::default();
        let cancel = CancellationToken::new();
        let use_case = PlanUseCase::new(&gateway, &config, &cancel);

        let thought = Thought {
            understanding: "u".to_string(),
            requirements: vec![],
            uncertainties: vec![],
            approach: "a".to_string(),
            needs_more_info: false,
            clarification_question: None,
        };
        let tools = vec![ToolDescriptor::new(
            "delete_clip",
            "Remove a clip",
            RiskLevel::High,
        )];
        let plan = use_case
            .execute_model(&thought, &EditorContext::new(), &tools)
            .await
            .expect("should plan");
        // Destructive tool gates the plan regardless of declared risk
        assert!(plan.requires_approval);
    }
}
