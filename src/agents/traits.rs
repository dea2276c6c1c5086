use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::deps::{BoundDependencies, Dependency};
use super::types::{AgentMessage, AgentOutput};
use crate::error::AgentDispatchError;

/// One declared input key of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    pub name: &'static str,
    pub type_hint: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl InputSpec {
    pub const fn required(
        name: &'static str,
        type_hint: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            type_hint,
            description,
            required: true,
        }
    }

    pub const fn optional(
        name: &'static str,
        type_hint: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            type_hint,
            description,
            required: false,
        }
    }
}

/// A specialist the planner can schedule.
///
/// The descriptor methods feed the capability description shown to the
/// planner; `requires` decides which collaborators the registry binds before
/// calling `handle`.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    fn role(&self) -> &str;

    fn inputs(&self) -> &[InputSpec];

    fn output_description(&self) -> &str;

    fn requires(&self) -> &[Dependency];

    /// Compression agents count their input/output difference as tokens saved.
    fn compresses(&self) -> bool {
        false
    }

    async fn handle(
        &self,
        message: AgentMessage,
        deps: &BoundDependencies<'_>,
    ) -> anyhow::Result<AgentOutput>;
}

/// Deserialize a message body into an agent's typed input.
pub fn parse_input<T: DeserializeOwned>(agent: &str, content: &Value) -> anyhow::Result<T> {
    serde_json::from_value(content.clone()).map_err(|e| {
        AgentDispatchError::InvalidInput {
            agent: agent.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

pub(crate) fn invalid_input(agent: &str, message: impl Into<String>) -> anyhow::Error {
    AgentDispatchError::InvalidInput {
        agent: agent.to_string(),
        message: message.into(),
    }
    .into()
}
