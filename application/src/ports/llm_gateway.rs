//! LLM Gateway port
//!
//! Defines the interface for structured generation against a language model.

use async_trait::async_trait;
use montage_domain::Message;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Model returned malformed output: {0}")]
    MalformedOutput(String),

    #[error("Gateway is not configured")]
    NotConfigured,

    #[error("Timeout")]
    Timeout,

    #[error("Generation aborted")]
    Aborted,

    #[error("Other error: {0}")]
    Other(String),
}

/// A request for schema-shaped model output.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub messages: Vec<Message>,
    /// Name of the expected shape, for logging and adapter routing
    pub schema_name: &'static str,
    /// JSON schema the response must conform to
    pub schema: Value,
}

impl StructuredRequest {
    pub fn new(messages: Vec<Message>, schema_name: &'static str, schema: Value) -> Self {
        Self {
            messages,
            schema_name,
            schema,
        }
    }
}

/// Gateway for LLM communication
///
/// This port defines how the application layer talks to a language model.
/// Implementations (adapters) live outside this crate.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Request schema-shaped JSON output
    async fn generate_structured(&self, request: StructuredRequest) -> Result<Value, GatewayError>;

    /// Request a plain text completion
    async fn complete(&self, messages: &[Message]) -> Result<String, GatewayError>;

    /// Request a completion delivered incrementally.
    ///
    /// Default implementation sends the whole completion as a single chunk.
    async fn complete_streaming(
        &self,
        messages: &[Message],
        chunks: tokio::sync::mpsc::Sender<String>,
    ) -> Result<(), GatewayError> {
        let text = self.complete(messages).await?;
        let _ = chunks.send(text).await;
        Ok(())
    }

    /// Stop any in-flight generation
    fn abort(&self);

    /// Whether a generation is currently in flight
    fn is_generating(&self) -> bool;

    /// Whether the gateway has credentials and a model selected
    fn is_configured(&self) -> bool;
}
