//! Planning, reference resolution, sequential execution and tracing.

pub mod executor;
pub mod planner;
pub mod reference;
pub mod registry;
pub mod resolver;
pub mod trace;
pub mod types;

pub use executor::{Engine, EngineDependencies};
pub use planner::{PlanParser, Planner};
pub use registry::{AgentRegistry, AgentRegistryBuilder};
pub use resolver::{render, resolve};
pub use trace::{ExecutionTrace, StepLogEntry, TraceStatus};
pub use types::{ExecutionState, Plan, PlanStep, ValidStep};

use serde_json::Value;

/// Plan and execute `goal`, returning the final output (if the run succeeded)
/// and the finalized trace.
pub async fn run_engine(goal: &str, deps: &EngineDependencies) -> (Option<Value>, ExecutionTrace) {
    Engine::new(deps.clone()).run(goal).await
}
