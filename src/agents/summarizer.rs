use async_trait::async_trait;
use serde::Deserialize;

use super::deps::{BoundDependencies, Dependency};
use super::traits::{Agent, InputSpec, invalid_input, parse_input};
use super::types::{AgentMessage, AgentOutput, TextSource};
use crate::llm::ResponseFormat;

const SYSTEM_PROMPT: &str = "You are an expert summarization AI. Your task is to reduce the provided \
text to its essential points, guided by the user's specific objective. The summary must be concise, \
accurate, and directly address the stated goal.";

const INPUTS: &[InputSpec] = &[
    InputSpec::required(
        "text_to_summarize",
        "String/Reference",
        "The long text to be summarized. Can be a reference to a previous step's output.",
    ),
    InputSpec::required(
        "summary_objective",
        "String",
        "A clear goal for the summary (e.g., \"Extract key technical specifications\").",
    ),
];

const REQUIRES: &[Dependency] = &[Dependency::Generation];

#[derive(Debug, Deserialize)]
struct SummarizerInput {
    #[serde(default)]
    text_to_summarize: Option<TextSource>,
    #[serde(default)]
    summary_objective: Option<TextSource>,
}

/// Compresses a long text toward a stated objective.
#[derive(Debug, Default, Clone, Copy)]
pub struct SummarizerAgent;

#[async_trait]
impl Agent for SummarizerAgent {
    fn name(&self) -> &str {
        "Summarizer"
    }

    fn role(&self) -> &str {
        "Reduces large text to a concise summary based on an objective. Ideal for managing token \
         counts before a generation step."
    }

    fn inputs(&self) -> &[InputSpec] {
        INPUTS
    }

    fn output_description(&self) -> &str {
        "A concise summary of the input text."
    }

    fn requires(&self) -> &[Dependency] {
        REQUIRES
    }

    fn compresses(&self) -> bool {
        true
    }

    async fn handle(
        &self,
        message: AgentMessage,
        deps: &BoundDependencies<'_>,
    ) -> anyhow::Result<AgentOutput> {
        let input: SummarizerInput = parse_input(self.name(), &message.content)?;
        let (Some(text), Some(objective)) = (
            input.text_to_summarize.and_then(TextSource::into_non_empty),
            input.summary_objective.and_then(TextSource::into_non_empty),
        ) else {
            return Err(invalid_input(
                self.name(),
                "requires 'text_to_summarize' and 'summary_objective'",
            ));
        };

        tracing::info!(chars = text.len(), "Summarizer reducing context");
        let user_prompt = format!(
            "--- OBJECTIVE ---\n{objective}\n\n--- TEXT TO SUMMARIZE ---\n{text}\n--- END TEXT ---\n\n\
             Generate the summary now."
        );
        let summary = deps
            .provider()?
            .generate(SYSTEM_PROMPT, &user_prompt, ResponseFormat::Text)
            .await?;

        Ok(AgentOutput::Summary { summary })
    }
}
