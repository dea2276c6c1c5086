#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod agents;
pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod search;
pub mod usage;

pub use config::Config;
pub use engine::{Engine, EngineDependencies, ExecutionTrace, TraceStatus, run_engine};
pub use error::{EngineError, Result};
