use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(in crate::llm) struct ChatRequest {
    pub(in crate::llm) model: String,
    pub(in crate::llm) messages: Vec<Message>,
    pub(in crate::llm) temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(in crate::llm) response_format: Option<ResponseFormatSpec>,
}

#[derive(Debug, Serialize)]
pub(in crate::llm) struct Message {
    pub(in crate::llm) role: &'static str,
    pub(in crate::llm) content: String,
}

#[derive(Debug, Serialize)]
pub(in crate::llm) struct ResponseFormatSpec {
    #[serde(rename = "type")]
    pub(in crate::llm) kind: &'static str,
}

#[derive(Debug, Deserialize)]
pub(in crate::llm) struct ChatResponse {
    pub(in crate::llm) choices: Vec<Choice>,
    pub(in crate::llm) usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
pub(in crate::llm) struct ChatUsage {
    pub(in crate::llm) prompt_tokens: u64,
    pub(in crate::llm) completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
pub(in crate::llm) struct Choice {
    pub(in crate::llm) message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(in crate::llm) struct ResponseMessage {
    pub(in crate::llm) content: Option<String>,
}
