mod types;

use self::types::{ChatRequest, ChatResponse, Message, ResponseFormatSpec};
use crate::llm::{ResponseFormat, build_provider_client, traits::Provider};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat-completions provider.
pub struct OpenAiProvider {
    /// Pre-computed `"Bearer <key>"` header value (avoids `format!` per request).
    cached_auth_header: Option<String>,
    cached_chat_url: String,
    model: String,
    temperature: f64,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(api_key: Option<&str>, model: &str, temperature: f64) -> Self {
        Self::with_base_url(DEFAULT_API_URL, api_key, model, temperature)
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: Option<&str>,
        model: &str,
        temperature: f64,
    ) -> Self {
        let base_url = base_url.trim_end_matches('/');
        let cached_chat_url = if base_url.ends_with("chat/completions") {
            base_url.to_string()
        } else {
            format!("{base_url}/chat/completions")
        };

        Self {
            cached_auth_header: api_key.map(|k| format!("Bearer {k}")),
            cached_chat_url,
            model: model.to_string(),
            temperature,
            client: build_provider_client(),
        }
    }

    pub fn chat_completions_url(&self) -> &str {
        &self.cached_chat_url
    }

    fn build_request(
        &self,
        system_prompt: &str,
        message: &str,
        format: ResponseFormat,
    ) -> ChatRequest {
        let response_format = match format {
            ResponseFormat::Text => None,
            ResponseFormat::Json => Some(ResponseFormatSpec { kind: "json_object" }),
        };

        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                // Prompts carry step data verbatim; only error bodies are scrubbed.
                Message {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                Message {
                    role: "user",
                    content: message.to_string(),
                },
            ],
            temperature: self.temperature,
            response_format,
        }
    }

    fn extract_text(chat_response: &ChatResponse) -> anyhow::Result<String> {
        chat_response
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(|text| text.trim().to_string())
            .ok_or_else(|| anyhow::anyhow!("No response from OpenAI"))
    }

    async fn call_api(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        let auth_header = self.cached_auth_header.as_ref().ok_or_else(|| {
            anyhow::anyhow!("OpenAI API key not set. Set OPENAI_API_KEY or edit config.toml.")
        })?;

        let response = self
            .client
            .post(&self.cached_chat_url)
            .header("Authorization", auth_header)
            .json(request)
            .send()
            .await
            .context("OpenAI request failed")?;

        if !response.status().is_success() {
            return Err(crate::llm::api_error("OpenAI", response).await);
        }

        response
            .json()
            .await
            .context("OpenAI response JSON decode failed")
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        format: ResponseFormat,
    ) -> anyhow::Result<String> {
        let request = self.build_request(system_prompt, user_prompt, format);
        let response = self.call_api(&request).await?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                model = self.model.as_str(),
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI call completed"
            );
        }

        Self::extract_text(&response)
    }
}
