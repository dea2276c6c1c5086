use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Value, json};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::planner::Planner;
use super::registry::AgentRegistry;
use super::resolver::{render, resolve_map};
use super::trace::{ExecutionTrace, StepLogEntry, TraceStatus};
use super::types::{ExecutionState, Plan, PlanStep};
use crate::agents::{AgentMessage, SharedDependencies};
use crate::error::{AgentDispatchError, EngineError, PlanningError, Result};
use crate::usage::{HeuristicTokenCounter, TokenCounter, tokens_saved};

const SENDER: &str = "Engine";

/// Everything a run needs. Cheap to clone; every member is shared.
#[derive(Clone)]
pub struct EngineDependencies {
    pub registry: Arc<AgentRegistry>,
    pub shared: SharedDependencies,
    pub token_counter: Arc<dyn TokenCounter>,
    pub run_timeout: Option<Duration>,
}

impl EngineDependencies {
    pub fn new(registry: Arc<AgentRegistry>, shared: SharedDependencies) -> Self {
        Self {
            registry,
            shared,
            token_counter: Arc::new(HeuristicTokenCounter),
            run_timeout: None,
        }
    }

    #[must_use]
    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.token_counter = counter;
        self
    }

    #[must_use]
    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }
}

/// Plans a goal and executes the plan one step at a time.
pub struct Engine {
    deps: EngineDependencies,
    planner: Planner,
}

/// Stops a run when its token fires or its deadline passes.
struct RunGuard {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

/// Why a guarded future did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupted {
    Cancelled,
    DeadlineExceeded,
}

impl From<Interrupted> for EngineError {
    fn from(reason: Interrupted) -> Self {
        match reason {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

impl From<Interrupted> for PlanningError {
    fn from(reason: Interrupted) -> Self {
        match reason {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

impl RunGuard {
    async fn race<F: Future>(&self, fut: F) -> std::result::Result<F::Output, Interrupted> {
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                tracing::warn!("Run cancelled");
                Err(Interrupted::Cancelled)
            }
            () = expired => {
                tracing::warn!("Run deadline exceeded");
                Err(Interrupted::DeadlineExceeded)
            }
            out = fut => Ok(out),
        }
    }
}

/// First fatal error of a run and the step it happened at.
struct StepFailure {
    step: u32,
    error: EngineError,
}

impl Engine {
    pub fn new(deps: EngineDependencies) -> Self {
        let planner = Planner::new(Arc::clone(&deps.shared.provider));
        Self { deps, planner }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.deps.registry
    }

    /// Plan without executing.
    pub async fn plan(&self, goal: &str) -> std::result::Result<Plan, PlanningError> {
        self.planner
            .plan(goal, &self.deps.registry.describe_capabilities())
            .await
    }

    pub async fn run(&self, goal: &str) -> (Option<Value>, ExecutionTrace) {
        self.run_with_cancel(goal, &CancellationToken::new()).await
    }

    /// Run `goal` to completion, cancellation, or first failure.
    ///
    /// Never returns an error: failures are recorded in the trace status and
    /// the final output is `None`.
    pub async fn run_with_cancel(
        &self,
        goal: &str,
        cancel: &CancellationToken,
    ) -> (Option<Value>, ExecutionTrace) {
        let mut trace = ExecutionTrace::new(goal);
        let guard = RunGuard {
            cancel: cancel.clone(),
            deadline: self.deps.run_timeout.map(|t| Instant::now() + t),
        };
        tracing::info!(run_id = trace.run_id(), goal, "Engine run started");

        let plan = match guard.race(self.plan(goal)).await {
            Ok(Ok(plan)) => plan,
            Ok(Err(e)) => {
                let reason = e.to_string();
                return Self::finish(trace, TraceStatus::PlanningFailed { reason }, None);
            }
            Err(interrupted) => {
                let reason = PlanningError::from(interrupted).to_string();
                return Self::finish(trace, TraceStatus::PlanningFailed { reason }, None);
            }
        };

        if let Err(e) = trace.log_plan(&plan) {
            let reason = EngineError::from(e).to_string();
            return Self::finish(trace, TraceStatus::PlanningFailed { reason }, None);
        }

        match self.execute(&plan, &mut trace, &guard).await {
            Ok(output) => Self::finish(trace, TraceStatus::Success, output),
            Err(StepFailure { step, error }) => {
                tracing::error!(step, error = %error, "Run failed");
                let status = TraceStatus::FailedAtStep {
                    step,
                    reason: error.to_string(),
                };
                Self::finish(trace, status, None)
            }
        }
    }

    fn finish(
        mut trace: ExecutionTrace,
        status: TraceStatus,
        output: Option<Value>,
    ) -> (Option<Value>, ExecutionTrace) {
        if let Err(e) = trace.finalize(status, output.clone()) {
            tracing::error!(error = %e, "Could not finalize trace");
        }
        tracing::info!(
            run_id = trace.run_id(),
            status = %trace.status(),
            steps = trace.steps().len(),
            "Engine run finished"
        );
        (output, trace)
    }

    async fn execute(
        &self,
        plan: &Plan,
        trace: &mut ExecutionTrace,
        guard: &RunGuard,
    ) -> std::result::Result<Option<Value>, StepFailure> {
        let mut state = ExecutionState::new();

        for (index, planned) in plan.steps.iter().enumerate() {
            let position = index + 1;
            let label = planned
                .number()
                .unwrap_or_else(|| u32::try_from(position).unwrap_or(u32::MAX));
            let fail = |error: EngineError| StepFailure { step: label, error };

            let entry = self
                .run_step(planned, position, &state, trace.run_id(), guard)
                .await
                .map_err(fail)?;

            let (step, output) = (entry.step, entry.output.clone());
            trace.log_step(entry).map_err(|e| fail(e.into()))?;
            state.record(step, output);
        }

        Ok(plan.final_step().and_then(|n| state.get(n).cloned()))
    }

    async fn run_step(
        &self,
        planned: &PlanStep,
        position: usize,
        state: &ExecutionState,
        run_id: &str,
        guard: &RunGuard,
    ) -> Result<StepLogEntry> {
        let step = planned.validate(position)?;
        tracing::info!(step = step.number, agent = step.agent, "Executing step");

        let resolved = Value::Object(resolve_map(step.input, state)?);
        let tokens_in = self.deps.token_counter.estimate(&render(&resolved));

        let started_at = Utc::now();
        let clock = std::time::Instant::now();
        let message = AgentMessage::new(SENDER, resolved.clone())
            .with_metadata("run_id", json!(run_id))
            .with_metadata("step", json!(step.number));
        let output = guard
            .race(
                self.deps
                    .registry
                    .dispatch(step.agent, message, &self.deps.shared),
            )
            .await
            .map_err(EngineError::from)??;

        let output = serde_json::to_value(&output).map_err(|e| AgentDispatchError::Failed {
            agent: step.agent.to_string(),
            source: e.into(),
        })?;
        let tokens_out = self.deps.token_counter.estimate(&render(&output));
        let saved = tokens_saved(
            self.deps.registry.compresses(step.agent),
            tokens_in,
            tokens_out,
        );
        tracing::info!(
            step = step.number,
            agent = step.agent,
            tokens_in,
            tokens_out,
            tokens_saved = saved,
            "Step complete"
        );

        Ok(StepLogEntry {
            step: step.number,
            agent: step.agent.to_string(),
            planned_input: planned.input.clone().unwrap_or(Value::Null),
            resolved_input: resolved,
            output,
            tokens_in,
            tokens_out,
            tokens_saved: saved,
            started_at,
            duration_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }
}
