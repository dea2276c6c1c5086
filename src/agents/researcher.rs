use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;

use super::deps::{BoundDependencies, Dependency};
use super::sanitize;
use super::traits::{Agent, InputSpec, invalid_input, parse_input};
use super::types::{AgentMessage, AgentOutput};
use crate::llm::ResponseFormat;

pub const NO_DATA_ANSWER: &str = "No data found on the topic.";
pub const SUSPECT_DATA_ANSWER: &str =
    "Could not generate a reliable answer as retrieved data was suspect.";

const TOP_K: usize = 15;

const SYSTEM_PROMPT: &str = "You are an expert research synthesis AI. Your task is to provide a \
clear, factual answer to the user's topic based *only* on the provided source texts. After the \
answer, you MUST provide a \"Sources\" section listing the unique source document names you used.";

const INPUTS: &[InputSpec] = &[InputSpec::required(
    "topic_query",
    "String",
    "The subject matter to research.",
)];

const REQUIRES: &[Dependency] = &[
    Dependency::Generation,
    Dependency::Search,
    Dependency::KnowledgeNamespace,
];

#[derive(Debug, Deserialize)]
struct ResearcherInput {
    topic_query: String,
}

/// Answers a topic from the knowledge namespace, citing the documents it used.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResearcherAgent;

#[async_trait]
impl Agent for ResearcherAgent {
    fn name(&self) -> &str {
        "Researcher"
    }

    fn role(&self) -> &str {
        "Retrieves and synthesizes factual information on a topic, citing its sources."
    }

    fn inputs(&self) -> &[InputSpec] {
        INPUTS
    }

    fn output_description(&self) -> &str {
        "A synthesized answer followed by a Sources list."
    }

    fn requires(&self) -> &[Dependency] {
        REQUIRES
    }

    async fn handle(
        &self,
        message: AgentMessage,
        deps: &BoundDependencies<'_>,
    ) -> anyhow::Result<AgentOutput> {
        let input: ResearcherInput = parse_input(self.name(), &message.content)?;
        let topic = input.topic_query.trim();
        if topic.is_empty() {
            return Err(invalid_input(self.name(), "'topic_query' must not be empty"));
        }

        let namespace = deps.knowledge_namespace()?;
        let matches = deps.search()?.search(topic, namespace, TOP_K).await?;
        if matches.is_empty() {
            tracing::warn!(topic, "Researcher found no relevant chunks");
            return Ok(research(NO_DATA_ANSWER.to_string(), Vec::new()));
        }

        let mut texts = Vec::with_capacity(matches.len());
        let mut sources = BTreeSet::new();
        for hit in matches {
            let Some(text) = hit.metadata.text else {
                tracing::debug!(id = %hit.id, "Skipping chunk without text");
                continue;
            };
            if let Err(e) = sanitize::check(&text) {
                tracing::warn!(id = %hit.id, error = %e, "Dropping suspect chunk");
                continue;
            }
            texts.push(text);
            sources.extend(hit.metadata.source);
        }

        if texts.is_empty() {
            tracing::warn!(topic, "Every retrieved chunk failed sanitization");
            return Ok(research(SUSPECT_DATA_ANSWER.to_string(), Vec::new()));
        }

        tracing::info!(chunks = texts.len(), "Researcher synthesizing answer");
        let user_prompt = format!(
            "Topic: {topic}\n\nSources:\n{}\n\n--- \nSynthesize your answer and list the source documents now.",
            texts.join("\n\n---\n\n")
        );
        let findings = deps
            .provider()?
            .generate(SYSTEM_PROMPT, &user_prompt, ResponseFormat::Text)
            .await?;

        let sources: Vec<String> = sources.into_iter().filter(|s| !s.is_empty()).collect();
        let listing = sources
            .iter()
            .map(|s| format!("- {s}"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(research(
            format!("{findings}\n\n**Sources:**\n{listing}"),
            sources,
        ))
    }
}

fn research(answer_with_sources: String, sources: Vec<String>) -> AgentOutput {
    AgentOutput::Research {
        answer_with_sources,
        sources,
    }
}
