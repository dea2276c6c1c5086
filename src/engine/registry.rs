//! Capability registry: agent name to handler plus declared dependencies.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::agents::{
    Agent, AgentMessage, AgentOutput, LibrarianAgent, ResearcherAgent, SharedDependencies,
    SummarizerAgent, WriterAgent,
};
use crate::error::AgentDispatchError;

/// Immutable set of agents the planner may schedule.
///
/// Built once through [`AgentRegistryBuilder`] and shared behind an `Arc`.
pub struct AgentRegistry {
    agents: BTreeMap<String, Arc<dyn Agent>>,
}

#[derive(Default)]
pub struct AgentRegistryBuilder {
    agents: BTreeMap<String, Arc<dyn Agent>>,
}

impl AgentRegistryBuilder {
    /// Register an agent. Replaces any existing agent with the same name.
    #[must_use]
    pub fn register(mut self, agent: impl Agent + 'static) -> Self {
        let agent: Arc<dyn Agent> = Arc::new(agent);
        self.agents.insert(agent.name().to_string(), agent);
        self
    }

    pub fn build(self) -> AgentRegistry {
        AgentRegistry {
            agents: self.agents,
        }
    }
}

impl AgentRegistry {
    pub fn builder() -> AgentRegistryBuilder {
        AgentRegistryBuilder::default()
    }

    /// Librarian, Researcher, Summarizer and Writer.
    pub fn with_default_agents() -> Self {
        Self::builder()
            .register(LibrarianAgent)
            .register(ResearcherAgent)
            .register(SummarizerAgent)
            .register(WriterAgent)
            .build()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Agent>> {
        self.agents.get(name)
    }

    /// Registered agent names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Whether the named agent counts toward tokens saved.
    pub fn compresses(&self, name: &str) -> bool {
        self.agents.get(name).is_some_and(|a| a.compresses())
    }

    /// Planner-facing description of every agent, sorted by name.
    pub fn describe_capabilities(&self) -> String {
        let mut out = String::from(
            "Available Agents and their required inputs.\n\
             CRITICAL: You MUST use the exact input key names provided for each agent.\n",
        );
        for (index, agent) in self.agents.values().enumerate() {
            let _ = writeln!(out, "\n{}. AGENT: {}", index + 1, agent.name());
            let _ = writeln!(out, "   ROLE: {}", agent.role());
            let _ = writeln!(out, "   INPUTS:");
            for input in agent.inputs() {
                let optional = if input.required { "" } else { ", optional" };
                let _ = writeln!(
                    out,
                    "     - \"{}\": ({}{}) {}",
                    input.name, input.type_hint, optional, input.description
                );
            }
            let _ = writeln!(out, "   OUTPUT: {}", agent.output_description());
        }
        out
    }

    /// Route a message to the named agent with only its declared dependencies bound.
    pub async fn dispatch(
        &self,
        agent_name: &str,
        message: AgentMessage,
        shared: &SharedDependencies,
    ) -> Result<AgentOutput, AgentDispatchError> {
        let agent = self
            .agents
            .get(agent_name)
            .ok_or_else(|| AgentDispatchError::NotFound {
                name: agent_name.to_string(),
            })?;

        let deps = shared.bind(agent.name(), agent.requires());
        tracing::debug!(agent = agent_name, requires = ?agent.requires(), "Dispatching");

        agent
            .handle(message, &deps)
            .await
            .map_err(|err| match err.downcast::<AgentDispatchError>() {
                Ok(dispatch) => dispatch,
                Err(source) => AgentDispatchError::Failed {
                    agent: agent_name.to_string(),
                    source,
                },
            })
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.names())
            .finish()
    }
}
