use async_trait::async_trait;
use serde::Deserialize;

use super::deps::{BoundDependencies, Dependency};
use super::traits::{Agent, InputSpec, invalid_input, parse_input};
use super::types::{AgentMessage, AgentOutput, TextSource};
use crate::llm::ResponseFormat;

const INPUTS: &[InputSpec] = &[
    InputSpec::required(
        "blueprint",
        "String/Reference",
        "The style instructions (usually from Librarian).",
    ),
    InputSpec::optional(
        "facts",
        "String/Reference",
        "Factual information (usually from Researcher). Use this OR previous_content.",
    ),
    InputSpec::optional(
        "previous_content",
        "String/Reference",
        "Existing text for rewriting. Use this OR facts.",
    ),
];

const REQUIRES: &[Dependency] = &[Dependency::Generation];

#[derive(Debug, Deserialize)]
struct WriterInput {
    #[serde(default, alias = "blueprint_json", alias = "instruction")]
    blueprint: Option<TextSource>,
    #[serde(default, alias = "evidence", alias = "data")]
    facts: Option<TextSource>,
    #[serde(default)]
    previous_content: Option<TextSource>,
}

/// Where the writer's source material came from.
enum Material {
    Facts(String),
    Rewrite(String),
}

/// Produces the final content by applying a blueprint to source material.
#[derive(Debug, Default, Clone, Copy)]
pub struct WriterAgent;

#[async_trait]
impl Agent for WriterAgent {
    fn name(&self) -> &str {
        "Writer"
    }

    fn role(&self) -> &str {
        "Generates or rewrites content by applying a Blueprint to source material."
    }

    fn inputs(&self) -> &[InputSpec] {
        INPUTS
    }

    fn output_description(&self) -> &str {
        "The final generated text content."
    }

    fn requires(&self) -> &[Dependency] {
        REQUIRES
    }

    async fn handle(
        &self,
        message: AgentMessage,
        deps: &BoundDependencies<'_>,
    ) -> anyhow::Result<AgentOutput> {
        let input: WriterInput = parse_input(self.name(), &message.content)?;
        let blueprint = input
            .blueprint
            .and_then(TextSource::into_non_empty)
            .ok_or_else(|| invalid_input(self.name(), "requires a 'blueprint'"))?;

        let material = match (
            input.facts.and_then(TextSource::into_non_empty),
            input.previous_content.and_then(TextSource::into_non_empty),
        ) {
            (Some(facts), _) => Material::Facts(facts),
            (None, Some(previous)) => Material::Rewrite(previous),
            (None, None) => {
                return Err(invalid_input(
                    self.name(),
                    "requires either 'facts' or 'previous_content'",
                ));
            }
        };

        let (label, source) = match &material {
            Material::Facts(text) => ("RESEARCH FINDINGS", text),
            Material::Rewrite(text) => ("PREVIOUS CONTENT (For Rewriting)", text),
        };
        tracing::info!(source = label, "Writer applying blueprint");

        let system_prompt = format!(
            "You are an expert content generation AI.\n\
             Your task is to generate content based on the provided SOURCE MATERIAL.\n\
             Crucially, you MUST structure, style, and constrain your output according to the following SEMANTIC BLUEPRINT.\n\n\
             --- SEMANTIC BLUEPRINT (JSON) ---\n{blueprint}\n--- END SEMANTIC BLUEPRINT ---\n\n\
             Adhere strictly to the blueprint's instructions, style guides, and goals."
        );
        let user_prompt = format!(
            "--- SOURCE MATERIAL ({label}) ---\n{source}\n--- END SOURCE MATERIAL ---\n\n\
             Generate the content now, following the blueprint precisely."
        );

        let report = deps
            .provider()?
            .generate(&system_prompt, &user_prompt, ResponseFormat::Text)
            .await?;
        Ok(AgentOutput::Report { report })
    }
}
