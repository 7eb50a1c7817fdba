//! Observe use case
//!
//! Assesses execution results against the plan's goal and decides whether
//! another iteration is warranted. Also applies the non-recoverable-failure
//! classification: when a failure references an entity that does not exist
//! in the current context, iteration is forced off to prevent the agent from
//! retrying an unfixable operation.

use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::EngineConfig;
use crate::ports::llm_gateway::{LlmGateway, StructuredRequest};
use crate::use_cases::shared::generate_structured_cancellable;
use crate::use_cases::types::EngineError;
use montage_domain::{
    find_missing_entity, EditorContext, EnginePromptTemplate, ExecutionRecord, Message,
    Observation, Plan,
};

/// Observation plus the doom-loop classification.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub observation: Observation,
    /// Entity id that provably does not exist, when one was found
    pub missing_entity: Option<String>,
}

/// Use case for the observation phase
pub struct ObserveUseCase<'a, G: LlmGateway> {
    gateway: &'a G,
    config: &'a EngineConfig,
    cancel: &'a CancellationToken,
}

impl<'a, G: LlmGateway> ObserveUseCase<'a, G> {
    pub fn new(gateway: &'a G, config: &'a EngineConfig, cancel: &'a CancellationToken) -> Self {
        Self {
            gateway,
            config,
            cancel,
        }
    }

    pub async fn execute(
        &self,
        plan: &Plan,
        records: &[ExecutionRecord],
        context: &EditorContext,
    ) -> Result<Assessment, EngineError> {
        let messages = vec![Message::user(EnginePromptTemplate::observing(plan, records))];

        let request = StructuredRequest::new(messages, "observation", observation_schema());
        let value = generate_structured_cancellable(
            self.gateway,
            request,
            self.config.observation_timeout,
            "observing",
            self.cancel,
        )
        .await?;

        let mut observation = Observation::from_json(&value)?;
        let missing_entity = classify_missing_entity(plan, records, context);

        // Another iteration cannot conjure a nonexistent clip or track into
        // being, so the model's iterate request is overridden.
        if let Some(entity) = &missing_entity {
            warn!(entity = %entity, "Failure references a nonexistent entity, stopping retries");
            observation.needs_iteration = false;
            observation.iteration_reason = None;
            observation.summary = format!(
                "Stopped automatic retries: `{}` does not exist in the current project",
                entity
            );
        }

        Ok(Assessment {
            observation,
            missing_entity,
        })
    }
}

/// Scans failed steps for references to entities the context does not know.
fn classify_missing_entity(
    plan: &Plan,
    records: &[ExecutionRecord],
    context: &EditorContext,
) -> Option<String> {
    let empty = Map::new();
    for record in records.iter().filter(|r| !r.result.success) {
        let message = record
            .result
            .error
            .as_ref()
            .map(|e| e.message.as_str())
            .unwrap_or("");
        let args = plan
            .steps
            .iter()
            .find(|s| s.id == record.step_id)
            .map(|s| &s.args)
            .unwrap_or(&empty);
        if let Some(entity) = find_missing_entity(message, args, context) {
            return Some(entity);
        }
    }
    None
}

fn observation_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "goalAchieved": { "type": "boolean" },
            "stateChanges": { "type": "array", "items": { "type": "string" } },
            "summary": { "type": "string" },
            "confidence": { "type": "number" },
            "needsIteration": { "type": "boolean" },
            "iterationReason": { "type": "string" }
        },
        "required": ["goalAchieved", "summary"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_gateway::GatewayError;
    use async_trait::async_trait;
    use montage_domain::{
        PlanStep, RiskLevel, RollbackStrategy, ToolError, ToolExecutionResult,
    };

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

    fn plan_with_step(step_id: &str, arg_clip: &str) -> Plan {
        let mut args = Map::new();
        args.insert("clipId".to_string(), json!(arg_clip));
        Plan {
            goal: "delete the clip".to_string(),
            steps: vec![PlanStep {
                id: step_id.to_string(),
                tool: "delete_clip".to_string(),
                args,
                description: String::new(),
                risk_level: RiskLevel::High,
                estimated_duration_ms: 10,
                depends_on: vec![],
                parallelizable: false,
            }],
            estimated_total_duration_ms: 10,
            requires_approval: false,
            rollback_strategy: RollbackStrategy::UndoCompletedSteps,
        }
    }

    fn iterate_forever_response() -> Value {
        json!({
            "goalAchieved": false,
            "summary": "Deletion failed, trying again",
            "confidence": 0.8,
            "needsIteration": true,
            "iterationReason": "The clip was not deleted"
        })
    }

    #[tokio::test]
    async fn test_observation_passes_through_when_recoverable() {
        let gateway = FixedGateway {
            value: iterate_forever_response(),
        };
        let config = EngineConfig::default();
        let cancel = CancellationToken::new();
        let use_case = ObserveUseCase::new(&gateway, &config, &cancel);

        // clip-1 exists, so the failure may be recoverable
        let context = EditorContext::new().with_clip("clip-1");
        let plan = plan_with_step("s1", "clip-1");
        let records = vec![ExecutionRecord::new(
            "s1",
            ToolExecutionResult::failure("delete_clip", ToolError::execution_failed("locked")),
        )];

        let assessment = use_case
            .execute(&plan, &records, &context)
            .await
            .expect("should observe");
        assert!(assessment.observation.needs_iteration);
        assert!(assessment.missing_entity.is_none());
    }

    #[tokio::test]
    async fn test_nonexistent_entity_forces_iteration_off() {
        let gateway = FixedGateway {
            value: iterate_forever_response(),
        };
        let config = EngineConfig::default();
        let cancel = CancellationToken::new();
        let use_case = ObserveUseCase::new(&gateway, &config, &cancel);

        // clip-404 is in the step args but absent from the context
        let context = EditorContext::new().with_clip("clip-1");
        let plan = plan_with_step("s1", "clip-404");
        let records = vec![ExecutionRecord::new(
            "s1",
            ToolExecutionResult::failure(
                "delete_clip",
                ToolError::not_found("Clip clip-404 not found"),
            ),
        )];

        let assessment = use_case
            .execute(&plan, &records, &context)
            .await
            .expect("should observe");
        assert!(!assessment.observation.needs_iteration);
        assert_eq!(assessment.missing_entity.as_deref(), Some("clip-404"));
        assert!(assessment.observation.summary.contains("Stopped automatic retries"));
    }
}
