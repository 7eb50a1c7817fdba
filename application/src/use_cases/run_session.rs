//! Run Session use case
//!
//! Orchestrates the think/plan/execute/observe loop for one instruction:
//!
//! | Phase                | Model path | Fast path |
//! |----------------------|------------|-----------|
//! | 1. Context refresh   | yes        | yes       |
//! | 2. Thinking          | yes        | skip      |
//! | 3. Planning          | yes        | skip      |
//! | 4. Approval gate     | if gated   | if gated  |
//! | 5. Executing         | yes        | yes       |
//! | 6. Observing         | yes        | yes       |
//!
//! The loop repeats (bounded by `max_iterations`) until the observer reports
//! the goal achieved or stops requesting iteration.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::ports::approval::{ApprovalPort, AutoApprove};
use crate::ports::checkpoint::CheckpointStorePort;
use crate::ports::context_refresher::ContextRefresherPort;
use crate::ports::event_sink::EngineEventSink;
use crate::ports::llm_gateway::LlmGateway;
use crate::ports::memory_store::{MemoryStorePort, NullMemoryStore};
use crate::ports::tool_executor::ToolExecutorPort;
use crate::use_cases::execute_plan::ExecutePlanUseCase;
use crate::use_cases::observe::ObserveUseCase;
use crate::use_cases::plan::PlanUseCase;
use crate::use_cases::shared::check_cancelled;
use crate::use_cases::think::ThinkUseCase;
use crate::use_cases::types::{EngineError, RunInput, RunOutcome, RunOutput};
use montage_domain::{
    current_timestamp_ms, truncate, AgentState, BudgetTracker, EngineEvent, EnginePhase,
};

struct ActiveSession {
    session_id: String,
    cancel: CancellationToken,
}

/// The agent orchestration engine.
///
/// Holds the injected collaborators and guarantees single-session semantics:
/// a second `run()` while one is active is rejected without mutating state.
pub struct AgenticEngine<G: LlmGateway, T: ToolExecutorPort> {
    gateway: Arc<G>,
    tool_executor: Arc<T>,
    approval: Arc<dyn ApprovalPort>,
    memory: Arc<dyn MemoryStorePort>,
    context_refresher: Option<Arc<dyn ContextRefresherPort>>,
    checkpoints: Option<Arc<dyn CheckpointStorePort>>,
    config: EngineConfig,
    active: Mutex<Option<ActiveSession>>,
}

impl<G: LlmGateway, T: ToolExecutorPort> AgenticEngine<G, T> {
    pub fn new(gateway: Arc<G>, tool_executor: Arc<T>) -> Self {
        Self {
            gateway,
            tool_executor,
            approval: Arc::new(AutoApprove),
            memory: Arc::new(NullMemoryStore),
            context_refresher: None,
            checkpoints: None,
            config: EngineConfig::default(),
            active: Mutex::new(None),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_approval(mut self, approval: Arc<dyn ApprovalPort>) -> Self {
        self.approval = approval;
        self
    }

    pub fn with_memory_store(mut self, memory: Arc<dyn MemoryStorePort>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_context_refresher(mut self, refresher: Arc<dyn ContextRefresherPort>) -> Self {
        self.context_refresher = Some(refresher);
        self
    }

    pub fn with_checkpoint_store(mut self, checkpoints: Arc<dyn CheckpointStorePort>) -> Self {
        self.checkpoints = Some(checkpoints);
        self
    }

    /// Whether a run is currently in progress.
    pub fn is_running(&self) -> bool {
        self.active.lock().unwrap().is_some()
    }

    /// Cancels the active run, if any.
    ///
    /// Cancellation is cooperative: the signal reaches the gateway (to stop
    /// in-flight generation) and every phase observes it at await points.
    pub fn abort(&self) {
        if let Some(active) = self.active.lock().unwrap().as_ref() {
            info!(session = %active.session_id, "Abort requested");
            active.cancel.cancel();
            self.gateway.abort();
        }
    }

    /// Runs one instruction to a terminal outcome.
    ///
    /// `Err` is returned only when a session is already active; every other
    /// ending (including failures and aborts) is reported in the output's
    /// [`RunOutcome`] with the finalized session state attached.
    pub async fn run(
        &self,
        input: RunInput,
        sink: &dyn EngineEventSink,
    ) -> Result<RunOutput, EngineError> {
        let session_id = format!("session-{}", current_timestamp_ms());
        let cancel = {
            let mut active = self.active.lock().unwrap();
            if active.is_some() {
                return Err(EngineError::SessionActive);
            }
            let token = CancellationToken::new();
            *active = Some(ActiveSession {
                session_id: session_id.clone(),
                cancel: token.clone(),
            });
            token
        };

        info!(session = %session_id, "Starting run: {}", truncate(&input.instruction, 120));
        let mut state = AgentState::new(&session_id, input.context.clone());
        self.memory.hydrate(&mut state.context).await;
        sink.emit(&EngineEvent::SessionStart {
            session_id,
            instruction: input.instruction.clone(),
        });

        let outcome = match self.drive(&input, &mut state, &cancel, sink).await {
            Ok(outcome) => outcome,
            Err(error) if error.is_cancelled() => {
                state.abort();
                sink.emit(&EngineEvent::SessionAborted);
                RunOutcome::Aborted
            }
            Err(error) => {
                let message = error.to_string();
                warn!("Run failed: {}", message);
                state.fail(&message);
                sink.emit(&EngineEvent::SessionFailed {
                    error: message.clone(),
                });
                RunOutcome::Failed { error: message }
            }
        };

        if outcome.is_success() {
            if let Some(record) = state.execution_history.last() {
                self.memory.record_tool_use(&record.tool).await;
            }
        }

        self.active.lock().unwrap().take();

        Ok(RunOutput {
            summary: state.summary(),
            state,
            outcome,
        })
    }

    async fn drive(
        &self,
        input: &RunInput,
        state: &mut AgentState,
        cancel: &CancellationToken,
        sink: &dyn EngineEventSink,
    ) -> Result<RunOutcome, EngineError> {
        let thinker = ThinkUseCase::new(self.gateway.as_ref(), &self.config, cancel);
        let planner = PlanUseCase::new(self.gateway.as_ref(), &self.config, cancel);
        let executor = ExecutePlanUseCase::new(self.tool_executor.as_ref(), &self.config, cancel);
        let observer = ObserveUseCase::new(self.gateway.as_ref(), &self.config, cancel);
        let guardrail = self.config.guardrail();
        let mut budget = BudgetTracker::new(self.config.max_tool_calls_per_run);
        let tools = self.tool_executor.available_tools();

        while state.increment_iteration(self.config.max_iterations) {
            check_cancelled(cancel)?;

            if let Some(refresher) = &self.context_refresher {
                match refresher.refresh().await {
                    Ok(mut fresh) => {
                        // The refreshed snapshot replaces entity lists;
                        // hydrated memory notes are kept when it has none.
                        if fresh.notes.is_empty() {
                            fresh.notes = state.context.notes.clone();
                        }
                        state.context = fresh;
                    }
                    Err(e) => {
                        warn!("Context refresh failed, keeping the previous snapshot: {}", e);
                    }
                }
            }

            // Fast path substitutes both model phases when it matches.
            let plan = match planner.try_fast_path(&input.instruction, &state.context) {
                Some(plan) => {
                    state.transition_to(EnginePhase::Planning);
                    sink.emit(&EngineEvent::PlanningStart);
                    sink.emit(&EngineEvent::PlanningComplete {
                        goal: plan.goal.clone(),
                        step_count: plan.steps.len(),
                        requires_approval: plan.requires_approval,
                        fast_path: true,
                    });
                    plan
                }
                None => {
                    state.transition_to(EnginePhase::Thinking);
                    sink.emit(&EngineEvent::ThinkingStart);
                    let thought = thinker
                        .execute(&input.instruction, &state.context, &input.history, &tools)
                        .await?;
                    sink.emit(&EngineEvent::ThinkingComplete {
                        understanding: thought.understanding.clone(),
                        needs_more_info: thought.needs_more_info,
                    });

                    if thought.needs_more_info {
                        let question = thought.clarification_question.clone().unwrap_or_default();
                        state.thought = Some(thought);
                        sink.emit(&EngineEvent::ClarificationRequired {
                            question: question.clone(),
                        });
                        state.complete();
                        sink.emit(&EngineEvent::SessionComplete {
                            summary: state.summary(),
                        });
                        return Ok(RunOutcome::ClarificationNeeded { question });
                    }

                    state.transition_to(EnginePhase::Planning);
                    sink.emit(&EngineEvent::PlanningStart);
                    let plan = planner
                        .execute_model(&thought, &state.context, &tools)
                        .await?;
                    state.thought = Some(thought);
                    sink.emit(&EngineEvent::PlanningComplete {
                        goal: plan.goal.clone(),
                        step_count: plan.steps.len(),
                        requires_approval: plan.requires_approval,
                        fast_path: false,
                    });
                    plan
                }
            };

            // Step budget is enforced before any execution: a breach here
            // means zero tool invocations happened.
            guardrail.check_step_budget(&plan)?;

            if plan.requires_approval {
                state.transition_to(EnginePhase::AwaitingApproval);
                sink.emit(&EngineEvent::ApprovalRequired {
                    goal: plan.goal.clone(),
                    step_count: plan.steps.len(),
                });
                // The decision can block on a human; abort() must still land.
                let decision = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                    decision = self.approval.decide(&plan) => decision,
                };
                let approved =
                    decision.map_err(|e| EngineError::ApprovalFailed(e.to_string()))?;
                sink.emit(&EngineEvent::ApprovalResponse { approved });
                if !approved {
                    info!("Plan denied at the approval gate");
                    state.plan = Some(plan);
                    state.complete();
                    sink.emit(&EngineEvent::SessionComplete {
                        summary: state.summary(),
                    });
                    return Ok(RunOutcome::ApprovalDenied);
                }
            }

            state.plan = Some(plan.clone());

            // A snapshot failure must not block the run.
            if let Some(checkpoints) = &self.checkpoints {
                match checkpoints.create(&plan.goal).await {
                    Ok(id) => info!(checkpoint = %id, "Created pre-execution checkpoint"),
                    Err(e) => warn!("Checkpoint creation failed: {}", e),
                }
            }

            state.transition_to(EnginePhase::Executing);
            sink.emit(&EngineEvent::ExecutionStart {
                step_count: plan.steps.len(),
            });
            let report = executor
                .execute(&plan, &input.execution, &mut budget, sink)
                .await?;
            sink.emit(&EngineEvent::ExecutionComplete {
                succeeded: report.succeeded_count(),
                failed: report.failed_step_ids.len(),
            });

            let iteration_records = report.records.clone();
            for record in report.records {
                state.record_execution(record);
            }
            if report.rollback.is_some() {
                state.rollback = report.rollback;
            }
            if let Some(breach) = report.budget_breach {
                return Err(EngineError::Budget(breach));
            }

            state.transition_to(EnginePhase::Observing);
            let assessment = observer
                .execute(&plan, &iteration_records, &state.context)
                .await?;
            if let Some(entity) = &assessment.missing_entity {
                sink.emit(&EngineEvent::DoomLoopDetected {
                    entity_id: entity.clone(),
                });
            }
            sink.emit(&EngineEvent::ObservationComplete {
                goal_achieved: assessment.observation.goal_achieved,
                needs_iteration: assessment.observation.needs_iteration,
            });
            sink.emit(&EngineEvent::IterationComplete {
                iteration: state.iteration,
            });

            let observation = assessment.observation;
            let finished = observation.goal_achieved || !observation.needs_iteration;
            state.last_observation = Some(observation);

            if finished {
                state.complete();
                sink.emit(&EngineEvent::SessionComplete {
                    summary: state.summary(),
                });
                return Ok(RunOutcome::Completed);
            }
            info!(iteration = state.iteration, "Observer requested another iteration");
        }

        Err(EngineError::MaxIterationsExceeded)
    }
}
