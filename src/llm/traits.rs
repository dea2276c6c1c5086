use async_trait::async_trait;

/// Shape the caller expects back from a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    /// Backend must return a single syntactically valid JSON object.
    Json,
}

/// Text-generation capability consumed by the planner and the agents.
///
/// Implementations are shared across concurrent runs and must not keep
/// run-specific mutable state.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider identifier (e.g. "openai").
    fn name(&self) -> &str;

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        format: ResponseFormat,
    ) -> anyhow::Result<String>;
}
