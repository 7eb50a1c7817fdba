//! Think use case
//!
//! Analyzes the user's instruction against the current editor state and
//! produces a structured [`Thought`].

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::EngineConfig;
use crate::ports::llm_gateway::{LlmGateway, StructuredRequest};
use crate::use_cases::shared::generate_structured_cancellable;
use crate::use_cases::types::EngineError;
use montage_domain::{EditorContext, EnginePromptTemplate, Message, Thought, ToolDescriptor};

/// Use case for the thinking phase
pub struct ThinkUseCase<'a, G: LlmGateway> {
    gateway: &'a G,
    config: &'a EngineConfig,
    cancel: &'a CancellationToken,
}

impl<'a, G: LlmGateway> ThinkUseCase<'a, G> {
    pub fn new(gateway: &'a G, config: &'a EngineConfig, cancel: &'a CancellationToken) -> Self {
        Self {
            gateway,
            config,
            cancel,
        }
    }

    pub async fn execute(
        &self,
        instruction: &str,
        context: &EditorContext,
        history: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<Thought, EngineError> {
        let messages = vec![
            Message::system(EnginePromptTemplate::system(context, tools)),
            Message::user(EnginePromptTemplate::thinking(instruction, history)),
        ];

        let request = StructuredRequest::new(messages, "thought", thought_schema());
        let value = generate_structured_cancellable(
            self.gateway,
            request,
            self.config.thinking_timeout,
            "thinking",
            self.cancel,
        )
        .await?;

        let thought = Thought::from_json(&value)?;
        debug!(
            needs_more_info = thought.needs_more_info,
            "Thinking complete: {}", thought.understanding
        );
        Ok(thought)
    }
}

fn thought_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "understanding": { "type": "string" },
            "requirements": { "type": "array", "items": { "type": "string" } },
            "uncertainties": { "type": "array", "items": { "type": "string" } },
            "approach": { "type": "string" },
            "needsMoreInfo": { "type": "boolean" },
            "clarificationQuestion": { "type": "string" }
        },
        "required": ["understanding", "approach"]
    })
}
