use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the engine.
///
/// Every failure that can end a run maps onto one of these variants. The
/// executor never lets them escape `run`: they are rendered into the trace
/// status instead. Collaborators (providers, search, config) keep using
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum EngineError {
    // ── Planning ────────────────────────────────────────────────────────
    #[error("planning: {0}")]
    Planning(#[from] PlanningError),

    // ── Resolution ──────────────────────────────────────────────────────
    #[error("dependency not found: $$STEP_{step}_OUTPUT$$ is not in execution state")]
    DependencyNotFound { step: u32 },

    // ── Dispatch ────────────────────────────────────────────────────────
    #[error("dispatch: {0}")]
    AgentDispatch(#[from] AgentDispatchError),

    // ── Plan step shape ─────────────────────────────────────────────────
    #[error("step structure: {0}")]
    StepStructure(#[from] StepStructureError),

    // ── Trace bookkeeping ───────────────────────────────────────────────
    #[error("trace: {0}")]
    Trace(#[from] TraceError),

    #[error("run cancelled")]
    Cancelled,

    #[error("run deadline exceeded")]
    DeadlineExceeded,
}

// ─── Planning errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("generation failed: {0}")]
    Generation(String),

    #[error("invalid plan JSON: {0}")]
    InvalidJson(String),

    #[error("response does not contain a \"plan\" list")]
    MissingPlan,

    #[error("plan must have at least one step")]
    EmptyPlan,

    #[error("duplicate plan step number: {0}")]
    DuplicateStep(u32),

    #[error("planning cancelled")]
    Cancelled,

    #[error("planning deadline exceeded")]
    DeadlineExceeded,
}

// ─── Dispatch errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AgentDispatchError {
    #[error("agent '{name}' not found in registry")]
    NotFound { name: String },

    #[error("agent '{agent}' did not declare dependency '{dependency}'")]
    MissingDependency { agent: String, dependency: String },

    #[error("agent '{agent}' rejected its input: {message}")]
    InvalidInput { agent: String, message: String },

    #[error("agent '{agent}' failed: {source}")]
    Failed {
        agent: String,
        #[source]
        source: anyhow::Error,
    },
}

// ─── Step structure errors ───────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StepStructureError {
    #[error("plan entry {position} is missing required field '{field}'")]
    MissingField { position: usize, field: &'static str },

    #[error("plan entry {position} has invalid step number {value}")]
    InvalidStepNumber { position: usize, value: String },

    #[error("plan entry {position} has non-string agent name {value}")]
    InvalidAgent { position: usize, value: String },

    #[error("step {step} input must be a mapping of parameter names to values")]
    InputNotMapping { step: u32 },
}

// ─── Trace errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("trace is already finalized")]
    Finalized,

    #[error("plan was already logged for this run")]
    PlanAlreadyLogged,

    #[error("finalize requires a terminal status")]
    NonTerminalStatus,
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for engine internals.
pub type Result<T> = std::result::Result<T, EngineError>;
