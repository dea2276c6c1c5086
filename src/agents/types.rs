use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PROTOCOL_VERSION: &str = "2.0 (Context Engine)";

/// Envelope carried between the engine and agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub protocol_version: String,
    pub sender: String,
    pub content: Value,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl AgentMessage {
    pub fn new(sender: impl Into<String>, content: Value) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            sender: sender.into(),
            content,
            metadata: Map::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Closed set of payloads an agent can produce.
///
/// Serialized untagged, so each variant is stored in execution state as a
/// plain mapping (`{"summary": "..."}`) and distinguished on the way back in
/// by its field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentOutput {
    Blueprint {
        blueprint_json: String,
    },
    Research {
        answer_with_sources: String,
        #[serde(default)]
        sources: Vec<String>,
    },
    Summary {
        summary: String,
    },
    Report {
        report: String,
    },
}

impl AgentOutput {
    /// The primary text of the payload.
    pub fn text(&self) -> &str {
        match self {
            Self::Blueprint { blueprint_json } => blueprint_json,
            Self::Research {
                answer_with_sources,
                ..
            } => answer_with_sources,
            Self::Summary { summary } => summary,
            Self::Report { report } => report,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Blueprint { .. } => "blueprint",
            Self::Research { .. } => "research",
            Self::Summary { .. } => "summary",
            Self::Report { .. } => "report",
        }
    }
}

/// An agent input that may be literal text or the raw output of an earlier step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TextSource {
    Output(AgentOutput),
    Text(String),
    Other(Value),
}

impl TextSource {
    pub fn into_text(self) -> String {
        match self {
            Self::Output(output) => output.text().to_string(),
            Self::Text(text) => text,
            Self::Other(value) => value.to_string(),
        }
    }

    /// Text form, or `None` when it is blank.
    pub fn into_non_empty(self) -> Option<String> {
        let text = self.into_text();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
