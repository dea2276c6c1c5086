use std::fmt;
use std::sync::Arc;

use crate::error::AgentDispatchError;
use crate::llm::Provider;
use crate::search::SearchIndex;

/// Collaborators an agent may ask the registry to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dependency {
    Generation,
    Search,
    ContextNamespace,
    KnowledgeNamespace,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Generation => "generation",
            Self::Search => "search",
            Self::ContextNamespace => "context_namespace",
            Self::KnowledgeNamespace => "knowledge_namespace",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    pub context: String,
    pub knowledge: String,
}

impl Default for Namespaces {
    fn default() -> Self {
        Self {
            context: "ContextLibrary".to_string(),
            knowledge: "KnowledgeStore".to_string(),
        }
    }
}

/// Everything the engine holds that agents might use. Shared across runs.
#[derive(Clone)]
pub struct SharedDependencies {
    pub provider: Arc<dyn Provider>,
    pub search: Arc<dyn SearchIndex>,
    pub namespaces: Namespaces,
}

impl SharedDependencies {
    pub fn new(provider: Arc<dyn Provider>, search: Arc<dyn SearchIndex>) -> Self {
        Self {
            provider,
            search,
            namespaces: Namespaces::default(),
        }
    }

    #[must_use]
    pub fn with_namespaces(mut self, namespaces: Namespaces) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Bind the declared subset for one dispatch.
    pub fn bind<'a>(&'a self, agent: &'a str, declared: &[Dependency]) -> BoundDependencies<'a> {
        let has = |d: Dependency| declared.contains(&d);
        BoundDependencies {
            agent,
            provider: has(Dependency::Generation).then(|| self.provider.as_ref()),
            search: has(Dependency::Search).then(|| self.search.as_ref()),
            context_namespace: has(Dependency::ContextNamespace)
                .then_some(self.namespaces.context.as_str()),
            knowledge_namespace: has(Dependency::KnowledgeNamespace)
                .then_some(self.namespaces.knowledge.as_str()),
        }
    }
}

impl fmt::Debug for SharedDependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedDependencies")
            .field("provider", &self.provider.name())
            .field("namespaces", &self.namespaces)
            .finish_non_exhaustive()
    }
}

/// The collaborators visible to a single agent call.
pub struct BoundDependencies<'a> {
    agent: &'a str,
    provider: Option<&'a dyn Provider>,
    search: Option<&'a dyn SearchIndex>,
    context_namespace: Option<&'a str>,
    knowledge_namespace: Option<&'a str>,
}

impl<'a> BoundDependencies<'a> {
    pub fn provider(&self) -> anyhow::Result<&'a dyn Provider> {
        self.provider
            .ok_or_else(|| self.missing(Dependency::Generation))
    }

    pub fn search(&self) -> anyhow::Result<&'a dyn SearchIndex> {
        self.search.ok_or_else(|| self.missing(Dependency::Search))
    }

    pub fn context_namespace(&self) -> anyhow::Result<&'a str> {
        self.context_namespace
            .ok_or_else(|| self.missing(Dependency::ContextNamespace))
    }

    pub fn knowledge_namespace(&self) -> anyhow::Result<&'a str> {
        self.knowledge_namespace
            .ok_or_else(|| self.missing(Dependency::KnowledgeNamespace))
    }

    fn missing(&self, dependency: Dependency) -> anyhow::Error {
        AgentDispatchError::MissingDependency {
            agent: self.agent.to_string(),
            dependency: dependency.to_string(),
        }
        .into()
    }
}
