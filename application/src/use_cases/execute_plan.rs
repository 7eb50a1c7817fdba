//! Execute Plan use case
//!
//! Runs a validated plan step by step: resolves value references, enforces
//! the tool-call budget, retries transient failures, and unwinds completed
//! steps in reverse order when execution fails partway.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::ports::event_sink::EngineEventSink;
use crate::ports::tool_executor::ToolExecutorPort;
use crate::use_cases::shared::check_cancelled;
use crate::use_cases::types::EngineError;
use montage_domain::{
    resolve_args, BudgetBreach, BudgetTracker, EngineEvent, ExecutionContext, ExecutionRecord,
    Plan, PlanStep, RollbackReport, RollbackStrategy, StepProgress, ToolCall, ToolError,
    ToolExecutionResult,
};

/// Outcome of executing a plan.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Every executed step, in completion order
    pub records: Vec<ExecutionRecord>,
    /// Steps that failed after retries
    pub failed_step_ids: Vec<String>,
    /// Steps never attempted because a dependency or an earlier step failed
    pub skipped_step_ids: Vec<String>,
    /// Rollback outcome, present only when execution failed partway
    pub rollback: Option<RollbackReport>,
    /// The budget ceiling hit mid-execution, if any
    pub budget_breach: Option<BudgetBreach>,
}

impl ExecutionReport {
    pub fn succeeded_count(&self) -> usize {
        self.records.iter().filter(|r| r.result.success).count()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed_step_ids.is_empty()
            && self.skipped_step_ids.is_empty()
            && self.budget_breach.is_none()
    }
}

/// Use case for the execution phase
pub struct ExecutePlanUseCase<'a, T: ToolExecutorPort> {
    tool_executor: &'a T,
    config: &'a EngineConfig,
    cancel: &'a CancellationToken,
}

impl<'a, T: ToolExecutorPort> ExecutePlanUseCase<'a, T> {
    pub fn new(tool_executor: &'a T, config: &'a EngineConfig, cancel: &'a CancellationToken) -> Self {
        Self {
            tool_executor,
            config,
            cancel,
        }
    }

    /// Executes the plan. `Err` is returned only for cancellation; step
    /// failures and budget breaches are reported in the [`ExecutionReport`].
    pub async fn execute(
        &self,
        plan: &Plan,
        execution: &ExecutionContext,
        budget: &mut BudgetTracker,
        sink: &dyn EngineEventSink,
    ) -> Result<ExecutionReport, EngineError> {
        let mut report = ExecutionReport::default();
        // Completed results keyed by step id, for value-reference resolution
        let mut results: HashMap<String, ToolExecutionResult> = HashMap::new();
        let total = plan.steps.len();
        let mut halted = false;

        // Plan validation guarantees dependencies point at earlier steps, so
        // plan order is already a topological order.
        for step in &plan.steps {
            if halted && self.config.stop_on_error {
                report.skipped_step_ids.push(step.id.clone());
                continue;
            }
            if self.dependency_unmet(step, &report) {
                report.skipped_step_ids.push(step.id.clone());
                continue;
            }

            check_cancelled(self.cancel)?;
            sink.emit(&EngineEvent::ExecutionProgress {
                step_id: step.id.clone(),
                status: StepProgress::Started,
                completion: report.records.len() as f64 / total as f64,
            });

            let result = match self.prepare_call(step, &results) {
                Ok(call) => match self.invoke_with_retries(&call, execution, budget).await? {
                    Some(result) => result,
                    None => {
                        // Budget exhausted before this attempt could run
                        report.budget_breach = Some(BudgetBreach::ToolCallBudget {
                            calls: budget.tool_calls(),
                            max: self.config.max_tool_calls_per_run,
                        });
                        halted = true;
                        report.skipped_step_ids.push(step.id.clone());
                        break;
                    }
                },
                // Resolution and validation failures abort just this step;
                // they consume no budget because no tool was invoked.
                Err(error) => ToolExecutionResult::failure(&step.tool, error),
            };

            let succeeded = result.success;
            let permission_denied = result
                .error
                .as_ref()
                .is_some_and(|e| e.code == "PERMISSION_DENIED");
            results.insert(step.id.clone(), result.clone());
            report
                .records
                .push(ExecutionRecord::new(&step.id, result));

            if succeeded {
                sink.emit(&EngineEvent::ExecutionProgress {
                    step_id: step.id.clone(),
                    status: StepProgress::Completed,
                    completion: report.records.len() as f64 / total as f64,
                });
            } else {
                warn!(step = %step.id, tool = %step.tool, "Step failed");
                report.failed_step_ids.push(step.id.clone());
                if permission_denied {
                    sink.emit(&EngineEvent::ToolPermissionRequired {
                        step_id: step.id.clone(),
                        tool: step.tool.clone(),
                    });
                }
                sink.emit(&EngineEvent::ExecutionProgress {
                    step_id: step.id.clone(),
                    status: StepProgress::Failed,
                    completion: report.records.len() as f64 / total as f64,
                });
                halted = true;
            }
        }

        if halted {
            report.rollback = Some(self.roll_back(plan, &report, execution, sink).await);
        }

        Ok(report)
    }

    fn dependency_unmet(&self, step: &PlanStep, report: &ExecutionReport) -> bool {
        step.depends_on.iter().any(|dep| {
            report.failed_step_ids.contains(dep) || report.skipped_step_ids.contains(dep)
        })
    }

    /// Resolves value references and validates arguments, producing the call.
    fn prepare_call(
        &self,
        step: &PlanStep,
        results: &HashMap<String, ToolExecutionResult>,
    ) -> Result<ToolCall, ToolError> {
        let args = resolve_args(&step.args, results)
            .map_err(|e| ToolError::invalid_argument(e.to_string()))?;
        let call = ToolCall::new(&step.tool)
            .with_arguments(args)
            .with_reasoning(&step.description);
        self.tool_executor.validate_args(&call)?;
        Ok(call)
    }

    /// Invokes the tool, retrying transient failures up to `max_retries`.
    ///
    /// Every attempt is charged against the budget before it runs; `Ok(None)`
    /// means the budget ran out. Per-attempt timeouts surface as transient
    /// timeout failures so they participate in the retry policy.
    async fn invoke_with_retries(
        &self,
        call: &ToolCall,
        execution: &ExecutionContext,
        budget: &mut BudgetTracker,
    ) -> Result<Option<ToolExecutionResult>, EngineError> {
        let mut attempt: u32 = 0;
        loop {
            if budget.charge().is_err() {
                return Ok(None);
            }
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(EngineError::Cancelled),
                _ = tokio::time::sleep(self.config.execution_timeout) => {
                    ToolExecutionResult::failure(
                        &call.tool_name,
                        ToolError::timeout(format!(
                            "`{}` did not complete within {:?}",
                            call.tool_name, self.config.execution_timeout
                        )),
                    )
                }
                result = self.tool_executor.execute(call, execution) => result,
            };

            if result.success || !result.is_transient_failure() || attempt > self.config.max_retries
            {
                return Ok(Some(result));
            }
            warn!(
                tool = %call.tool_name,
                attempt,
                "Transient tool failure, retrying"
            );
        }
    }

    /// Undoes every successful step so far, in reverse completion order.
    ///
    /// Rollback invocations are not charged against the tool-call budget;
    /// charging them would make cleanup impossible exactly when the budget
    /// caused the failure.
    async fn roll_back(
        &self,
        plan: &Plan,
        report: &ExecutionReport,
        execution: &ExecutionContext,
        sink: &dyn EngineEventSink,
    ) -> RollbackReport {
        if !self.config.enable_auto_rollback_on_failure
            || plan.rollback_strategy == RollbackStrategy::None
        {
            return RollbackReport {
                attempted: false,
                reason: Some("auto-rollback is disabled".to_string()),
                ..Default::default()
            };
        }

        let mut rollback = RollbackReport {
            attempted: true,
            reason: Some("execution failed partway".to_string()),
            ..Default::default()
        };

        for record in report.records.iter().rev() {
            if !record.result.success || !record.result.undoable {
                continue;
            }
            let Some(undo) = &record.result.undo_operation else {
                continue;
            };

            rollback.attempted_count += 1;
            let result = self.tool_executor.execute(undo, execution).await;
            if result.success {
                rollback.succeeded_count += 1;
            } else {
                warn!(step = %record.step_id, "Undo operation failed");
                rollback.failures.push(record.step_id.clone());
            }
        }

        info!(
            attempted = rollback.attempted_count,
            succeeded = rollback.succeeded_count,
            "Rollback complete"
        );
        sink.emit(&EngineEvent::RollbackComplete {
            attempted_count: rollback.attempted_count,
            succeeded_count: rollback.succeeded_count,
        });
        rollback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::event_sink::NullEventSink;
    use async_trait::async_trait;
    use montage_domain::{RiskLevel, ToolDescriptor};
    use serde_json::{json, Map};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Tool executor that returns scripted results per tool name and records
    /// every invocation.
    struct ScriptedExecutor {
        scripts: Mutex<HashMap<String, VecDeque<ToolExecutionResult>>>,
        calls: Mutex<Vec<ToolCall>>,
    }

    impl ScriptedExecutor {
        fn new() -> Self {
            Self {
                scripts: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn script(self, tool: &str, result: ToolExecutionResult) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .entry(tool.to_string())
                .or_default()
                .push_back(result);
            self
        }

        fn calls(&self) -> Vec<ToolCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolExecutorPort for ScriptedExecutor {
        fn available_tools(&self) -> Vec<ToolDescriptor> {
            vec![
                ToolDescriptor::new("split_clip", "Split", RiskLevel::Medium),
                ToolDescriptor::new("delete_clip", "Delete", RiskLevel::High),
                ToolDescriptor::new("insert_clip", "Insert", RiskLevel::Medium),
                ToolDescriptor::new("merge_clips", "Merge", RiskLevel::Medium),
            ]
        }

        async fn execute(&self, call: &ToolCall, _context: &ExecutionContext) -> ToolExecutionResult {
            self.calls.lock().unwrap().push(call.clone());
            self.scripts
                .lock()
                .unwrap()
                .get_mut(&call.tool_name)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| ToolExecutionResult::success(&call.tool_name))
        }
    }

    fn step(id: &str, tool: &str, depends_on: &[&str]) -> PlanStep {
        PlanStep {
            id: id.to_string(),
            tool: tool.to_string(),
            args: Map::new(),
            description: String::new(),
            risk_level: RiskLevel::Medium,
            estimated_duration_ms: 10,
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            parallelizable: false,
        }
    }

    fn plan(steps: Vec<PlanStep>) -> Plan {
        Plan {
            goal: "test".to_string(),
            steps,
            estimated_total_duration_ms: 10,
            requires_approval: false,
            rollback_strategy: RollbackStrategy::UndoCompletedSteps,
        }
    }

    async fn run(
        executor: &ScriptedExecutor,
        config: &EngineConfig,
        plan: &Plan,
    ) -> ExecutionReport {
        let cancel = CancellationToken::new();
        let use_case = ExecutePlanUseCase::new(executor, config, &cancel);
        let mut budget = BudgetTracker::new(config.max_tool_calls_per_run);
        use_case
            .execute(plan, &ExecutionContext::default(), &mut budget, &NullEventSink)
            .await
            .expect("should not cancel")
    }

    #[tokio::test]
    async fn test_happy_path_executes_all_steps() {
        let executor = ScriptedExecutor::new();
        let config = EngineConfig::default();
        let p = plan(vec![
            step("s1", "split_clip", &[]),
            step("s2", "merge_clips", &["s1"]),
        ]);

        let report = run(&executor, &config, &p).await;
        assert!(report.is_complete_success());
        assert_eq!(report.records.len(), 2);
        assert!(report.rollback.is_none());
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let executor = ScriptedExecutor::new()
            .script(
                "split_clip",
                ToolExecutionResult::failure("split_clip", ToolError::timeout("slow")),
            )
            .script("split_clip", ToolExecutionResult::success("split_clip"));
        let config = EngineConfig::default();
        let p = plan(vec![step("s1", "split_clip", &[])]);

        let report = run(&executor, &config, &p).await;
        assert!(report.is_complete_success());
        assert_eq!(executor.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let executor = ScriptedExecutor::new().script(
            "split_clip",
            ToolExecutionResult::failure("split_clip", ToolError::not_found("gone")),
        );
        let config = EngineConfig::default();
        let p = plan(vec![step("s1", "split_clip", &[])]);

        let report = run(&executor, &config, &p).await;
        assert_eq!(report.failed_step_ids, vec!["s1"]);
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_tool_budget_counts_every_attempt() {
        // One transient failure then success, under a one-call budget:
        // the tool runs exactly once and the breach is reported.
        let executor = ScriptedExecutor::new()
            .script(
                "split_clip",
                ToolExecutionResult::failure("split_clip", ToolError::timeout("slow")),
            )
            .script("split_clip", ToolExecutionResult::success("split_clip"));
        let config = EngineConfig::default().with_max_tool_calls_per_run(1);
        let p = plan(vec![step("s1", "split_clip", &[])]);

        let report = run(&executor, &config, &p).await;
        assert!(matches!(
            report.budget_breach,
            Some(BudgetBreach::ToolCallBudget { .. })
        ));
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_step_skips_dependents_and_rolls_back() {
        let executor = ScriptedExecutor::new()
            .script(
                "split_clip",
                ToolExecutionResult::success("split_clip")
                    .with_undo(ToolCall::new("merge_clips").with_arg("clipId", "clip-1")),
            )
            .script(
                "delete_clip",
                ToolExecutionResult::failure("delete_clip", ToolError::not_found("gone")),
            );
        let config = EngineConfig::default();
        let p = plan(vec![
            step("s1", "split_clip", &[]),
            step("s2", "delete_clip", &["s1"]),
            step("s3", "insert_clip", &["s2"]),
        ]);

        let report = run(&executor, &config, &p).await;
        assert_eq!(report.failed_step_ids, vec!["s2"]);
        assert_eq!(report.skipped_step_ids, vec!["s3"]);

        let rollback = report.rollback.expect("rollback should run");
        assert!(rollback.attempted);
        assert_eq!(rollback.attempted_count, 1);
        assert_eq!(rollback.succeeded_count, 1);

        // The undo call is the merge that reverses the split
        let calls = executor.calls();
        assert_eq!(calls.last().unwrap().tool_name, "merge_clips");
    }

    #[tokio::test]
    async fn test_rollback_runs_in_reverse_completion_order() {
        let executor = ScriptedExecutor::new()
            .script(
                "split_clip",
                ToolExecutionResult::success("split_clip")
                    .with_undo(ToolCall::new("merge_clips").with_arg("order", 1)),
            )
            .script(
                "insert_clip",
                ToolExecutionResult::success("insert_clip")
                    .with_undo(ToolCall::new("delete_clip").with_arg("order", 2)),
            )
            .script(
                "delete_clip",
                ToolExecutionResult::failure("delete_clip", ToolError::not_found("gone")),
            );
        let config = EngineConfig::default();
        let p = plan(vec![
            step("s1", "split_clip", &[]),
            step("s2", "insert_clip", &[]),
            step("s3", "delete_clip", &[]),
        ]);

        let report = run(&executor, &config, &p).await;
        let rollback = report.rollback.expect("rollback should run");
        assert_eq!(rollback.attempted_count, 2);

        // Undo of s2 (order 2) must run before undo of s1 (order 1)
        let calls = executor.calls();
        let undo_calls: Vec<_> = calls
            .iter()
            .filter_map(|c| c.arguments.get("order").and_then(|v| v.as_i64()))
            .collect();
        assert_eq!(undo_calls, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_rollback_disabled_reports_reason() {
        let executor = ScriptedExecutor::new().script(
            "split_clip",
            ToolExecutionResult::failure("split_clip", ToolError::not_found("gone")),
        );
        let config = EngineConfig::default().without_auto_rollback();
        let p = plan(vec![step("s1", "split_clip", &[])]);

        let report = run(&executor, &config, &p).await;
        let rollback = report.rollback.expect("report should exist");
        assert!(!rollback.attempted);
        assert!(rollback.reason.is_some());
    }

    #[tokio::test]
    async fn test_unresolvable_reference_fails_only_that_step() {
        let mut args = Map::new();
        args.insert(
            "clipId".to_string(),
            json!({ "$fromStep": "s0", "$path": "data.x" }),
        );
        let mut bad_step = step("s1", "delete_clip", &[]);
        bad_step.args = args;

        let executor = ScriptedExecutor::new();
        let config = EngineConfig::default();
        let p = plan(vec![bad_step]);

        let report = run(&executor, &config, &p).await;
        assert_eq!(report.failed_step_ids, vec!["s1"]);
        // No tool invocation happened for the unresolvable step
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reference_resolution_feeds_later_step() {
        let executor = ScriptedExecutor::new().script(
            "split_clip",
            ToolExecutionResult::success("split_clip").with_data(json!({ "rightClipId": "clip-1b" })),
        );
        let config = EngineConfig::default();

        let mut args = Map::new();
        args.insert(
            "clipId".to_string(),
            json!({ "$fromStep": "s1", "$path": "data.rightClipId" }),
        );
        let mut dependent = step("s2", "delete_clip", &["s1"]);
        dependent.args = args;

        let p = plan(vec![step("s1", "split_clip", &[]), dependent]);
        let report = run(&executor, &config, &p).await;
        assert!(report.is_complete_success());

        let calls = executor.calls();
        assert_eq!(calls[1].get_string("clipId"), Some("clip-1b"));
    }

    #[tokio::test]
    async fn test_permission_denied_emits_permission_event() {
        struct CollectingSink {
            events: Mutex<Vec<EngineEvent>>,
        }

        impl EngineEventSink for CollectingSink {
            fn emit(&self, event: &EngineEvent) {
                self.events.lock().unwrap().push(event.clone());
            }
        }

        let executor = ScriptedExecutor::new().script(
            "delete_clip",
            ToolExecutionResult::failure(
                "delete_clip",
                ToolError::permission_denied("project is locked"),
            ),
        );
        let config = EngineConfig::default();
        let p = plan(vec![step("s1", "delete_clip", &[])]);

        let sink = CollectingSink {
            events: Mutex::new(Vec::new()),
        };
        let cancel = CancellationToken::new();
        let use_case = ExecutePlanUseCase::new(&executor, &config, &cancel);
        let mut budget = BudgetTracker::new(config.max_tool_calls_per_run);
        let report = use_case
            .execute(&p, &ExecutionContext::default(), &mut budget, &sink)
            .await
            .expect("should not cancel");

        assert_eq!(report.failed_step_ids, vec!["s1"]);
        // Permission denial is deterministic, so no retry happened
        assert_eq!(executor.calls().len(), 1);
        assert!(sink.events.lock().unwrap().iter().any(|e| matches!(
            e,
            EngineEvent::ToolPermissionRequired { tool, .. } if tool == "delete_clip"
        )));
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_without_invocation() {
        let executor = ScriptedExecutor::new();
        let config = EngineConfig::default();
        let p = plan(vec![step("s1", "explode_timeline", &[])]);

        let report = run(&executor, &config, &p).await;
        assert_eq!(report.failed_step_ids, vec!["s1"]);
        assert!(executor.calls().is_empty());
    }
}
