use async_trait::async_trait;
use serde::Deserialize;

use super::deps::{BoundDependencies, Dependency};
use super::traits::{Agent, InputSpec, invalid_input, parse_input};
use super::types::{AgentMessage, AgentOutput};

pub const DEFAULT_BLUEPRINT: &str = r#"{"instruction": "Generate the content neutrally."}"#;

const INPUTS: &[InputSpec] = &[InputSpec::required(
    "intent_query",
    "String",
    "A descriptive phrase of the desired style (e.g., \"suspenseful narrative blueprint\").",
)];

const REQUIRES: &[Dependency] = &[Dependency::Search, Dependency::ContextNamespace];

#[derive(Debug, Deserialize)]
struct LibrarianInput {
    intent_query: String,
}

/// Retrieves the semantic blueprint that best matches a style intent.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibrarianAgent;

#[async_trait]
impl Agent for LibrarianAgent {
    fn name(&self) -> &str {
        "Librarian"
    }

    fn role(&self) -> &str {
        "Retrieves Semantic Blueprints (style/structure instructions)."
    }

    fn inputs(&self) -> &[InputSpec] {
        INPUTS
    }

    fn output_description(&self) -> &str {
        "The blueprint structure (JSON string)."
    }

    fn requires(&self) -> &[Dependency] {
        REQUIRES
    }

    async fn handle(
        &self,
        message: AgentMessage,
        deps: &BoundDependencies<'_>,
    ) -> anyhow::Result<AgentOutput> {
        let input: LibrarianInput = parse_input(self.name(), &message.content)?;
        let intent = input.intent_query.trim();
        if intent.is_empty() {
            return Err(invalid_input(self.name(), "'intent_query' must not be empty"));
        }

        let namespace = deps.context_namespace()?;
        let matches = deps.search()?.search(intent, namespace, 1).await?;

        let blueprint_json = match matches.into_iter().next() {
            Some(hit) => {
                tracing::info!(id = %hit.id, score = hit.score, "Librarian found blueprint");
                hit.metadata.blueprint_json.ok_or_else(|| {
                    anyhow::anyhow!("blueprint '{}' has no blueprint_json metadata", hit.id)
                })?
            }
            None => {
                tracing::warn!(intent, "No blueprint matched; using the neutral default");
                DEFAULT_BLUEPRINT.to_string()
            }
        };

        Ok(AgentOutput::Blueprint { blueprint_json })
    }
}
