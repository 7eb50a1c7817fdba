//! Tool Executor port
//!
//! Defines the interface for executing editor tools (splits, deletions,
//! moves, track operations).

use async_trait::async_trait;
use montage_domain::{ExecutionContext, ToolCall, ToolDescriptor, ToolError, ToolExecutionResult};

/// Port for tool execution
///
/// This port defines how the application layer invokes editor operations.
/// Implementations (adapters) live outside this crate.
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Descriptors of all available tools
    fn available_tools(&self) -> Vec<ToolDescriptor>;

    /// Check if a tool is available
    fn has_tool(&self, name: &str) -> bool {
        self.available_tools().iter().any(|t| t.name == name)
    }

    /// Validate a call's arguments without executing it.
    ///
    /// Default implementation only checks that the tool exists.
    fn validate_args(&self, call: &ToolCall) -> Result<(), ToolError> {
        if self.has_tool(&call.tool_name) {
            Ok(())
        } else {
            Err(ToolError::not_found(format!(
                "Unknown tool `{}`",
                call.tool_name
            )))
        }
    }

    /// Execute a single tool call
    async fn execute(&self, call: &ToolCall, context: &ExecutionContext) -> ToolExecutionResult;

    /// Execute several calls in order.
    ///
    /// Default implementation runs them sequentially.
    async fn execute_batch(
        &self,
        calls: &[ToolCall],
        context: &ExecutionContext,
    ) -> Vec<ToolExecutionResult> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.execute(call, context).await);
        }
        results
    }

    /// Execute independent calls concurrently.
    ///
    /// Only valid for calls with no ordering constraints between them.
    /// Results come back in call order.
    async fn execute_parallel(
        &self,
        calls: &[ToolCall],
        context: &ExecutionContext,
    ) -> Vec<ToolExecutionResult> {
        futures::future::join_all(calls.iter().map(|call| self.execute(call, context))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use montage_domain::RiskLevel;
    use std::sync::Mutex;

    struct EchoExecutor {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ToolExecutorPort for EchoExecutor {
        fn available_tools(&self) -> Vec<ToolDescriptor> {
            vec![ToolDescriptor::new("split_clip", "Split a clip", RiskLevel::Medium)]
        }

        async fn execute(
            &self,
            call: &ToolCall,
            _context: &ExecutionContext,
        ) -> ToolExecutionResult {
            self.seen.lock().unwrap().push(call.tool_name.clone());
            ToolExecutionResult::success(&call.tool_name)
        }
    }

    #[test]
    fn test_validate_args_rejects_unknown_tool() {
        let executor = EchoExecutor {
            seen: Mutex::new(Vec::new()),
        };
        assert!(executor.validate_args(&ToolCall::new("split_clip")).is_ok());
        let err = executor
            .validate_args(&ToolCall::new("explode_clip"))
            .unwrap_err();
        assert_eq!(err.code, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_parallel_results_keep_call_order() {
        let executor = EchoExecutor {
            seen: Mutex::new(Vec::new()),
        };
        let calls = vec![
            ToolCall::new("split_clip").with_arg("clipId", "clip-1"),
            ToolCall::new("split_clip").with_arg("clipId", "clip-2"),
        ];
        let results = executor
            .execute_parallel(&calls, &ExecutionContext::default())
            .await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
    }
}
