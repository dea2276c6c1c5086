use std::fmt::{self, Write as _};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::types::Plan;
use crate::error::TraceError;

/// Where a run currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TraceStatus {
    Initialized,
    PlanningFailed { reason: String },
    Executing,
    FailedAtStep { step: u32, reason: String },
    Success,
}

impl TraceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::PlanningFailed { .. } | Self::FailedAtStep { .. } | Self::Success
        )
    }
}

impl fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialized => f.write_str("Initialized"),
            Self::PlanningFailed { reason } => write!(f, "Planning failed: {reason}"),
            Self::Executing => f.write_str("Executing"),
            Self::FailedAtStep { step, reason } => write!(f, "Failed at step {step}: {reason}"),
            Self::Success => f.write_str("Success"),
        }
    }
}

/// Record of one completed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepLogEntry {
    pub step: u32,
    pub agent: String,
    pub planned_input: Value,
    pub resolved_input: Value,
    pub output: Value,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub tokens_saved: u64,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Append-only record of a single run.
///
/// Once finalized, every further mutation is rejected with
/// [`TraceError::Finalized`] and leaves the trace as it was.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionTrace {
    run_id: String,
    goal: String,
    plan: Option<Plan>,
    steps: Vec<StepLogEntry>,
    status: TraceStatus,
    final_output: Option<Value>,
    started_at: DateTime<Utc>,
    duration_ms: Option<u64>,
    #[serde(skip)]
    clock: Instant,
}

impl ExecutionTrace {
    pub fn new(goal: &str) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            goal: goal.to_string(),
            plan: None,
            steps: Vec::new(),
            status: TraceStatus::Initialized,
            final_output: None,
            started_at: Utc::now(),
            duration_ms: None,
            clock: Instant::now(),
        }
    }

    /// Record the plan. Allowed once, before finalize.
    pub fn log_plan(&mut self, plan: &Plan) -> Result<(), TraceError> {
        self.ensure_open()?;
        if self.plan.is_some() {
            return Err(TraceError::PlanAlreadyLogged);
        }
        self.plan = Some(plan.clone());
        self.status = TraceStatus::Executing;
        Ok(())
    }

    pub fn log_step(&mut self, entry: StepLogEntry) -> Result<(), TraceError> {
        self.ensure_open()?;
        self.steps.push(entry);
        Ok(())
    }

    /// Close the trace with a terminal status and optional final output.
    pub fn finalize(&mut self, status: TraceStatus, output: Option<Value>) -> Result<(), TraceError> {
        self.ensure_open()?;
        if !status.is_terminal() {
            return Err(TraceError::NonTerminalStatus);
        }
        self.status = status;
        self.final_output = output;
        self.duration_ms = Some(u64::try_from(self.clock.elapsed().as_millis()).unwrap_or(u64::MAX));
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), TraceError> {
        if self.is_finalized() {
            Err(TraceError::Finalized)
        } else {
            Ok(())
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.duration_ms.is_some()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn steps(&self) -> &[StepLogEntry] {
        &self.steps
    }

    pub fn status(&self) -> &TraceStatus {
        &self.status
    }

    pub fn final_output(&self) -> Option<&Value> {
        self.final_output.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_ms.map(Duration::from_millis)
    }

    pub fn total_tokens_saved(&self) -> u64 {
        self.steps.iter().map(|s| s.tokens_saved).sum()
    }

    /// Human-readable rendering for terminals.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Run {}", self.run_id);
        let _ = writeln!(out, "Goal: {}", self.goal);
        let _ = writeln!(out, "Status: {}", self.status);
        if let Some(ms) = self.duration_ms {
            let _ = writeln!(out, "Duration: {:.2}s", ms as f64 / 1000.0);
        }
        if let Some(plan) = &self.plan {
            let _ = writeln!(out, "Plan: {} step(s)", plan.len());
        }
        for entry in &self.steps {
            let _ = writeln!(
                out,
                "  [{}] {} tokens in={} out={} saved={} ({} ms)",
                entry.step,
                entry.agent,
                entry.tokens_in,
                entry.tokens_out,
                entry.tokens_saved,
                entry.duration_ms
            );
        }
        let saved = self.total_tokens_saved();
        if saved > 0 {
            let _ = writeln!(out, "Tokens saved: {saved}");
        }
        out
    }
}
