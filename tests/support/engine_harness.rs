#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use context_engine::agents::{
    Agent, AgentMessage, AgentOutput, BoundDependencies, Dependency, InputSpec,
    SharedDependencies,
};
use context_engine::engine::{AgentRegistry, EngineDependencies};
use context_engine::llm::{Provider, ResponseFormat};
use context_engine::search::{EmbeddingProvider, InMemoryIndex, NoopEmbedding, SearchIndex};

/// Replays responses in order and records every call.
pub struct ScriptedProvider {
    responses: Mutex<Vec<String>>,
    pub calls: Mutex<Vec<(String, String, ResponseFormat)>>,
}

impl ScriptedProvider {
    pub fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().rev().map(ToString::to_string).collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn user_prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, user, _)| user.clone())
            .collect()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        format: ResponseFormat,
    ) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push((
            system_prompt.to_string(),
            user_prompt.to_string(),
            format,
        ));
        self.responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| anyhow::anyhow!("script exhausted"))
    }
}

/// Bag-of-words embedding: one dimension per hashed lowercase word.
pub struct WordEmbedding;

const DIMS: usize = 64;

fn bucket(word: &str) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in word.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    usize::try_from(hash % DIMS as u64).unwrap()
}

#[async_trait]
impl EmbeddingProvider for WordEmbedding {
    fn name(&self) -> &str {
        "words"
    }

    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0_f32; DIMS];
                for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
                    v[bucket(&word.to_lowercase())] += 1.0;
                }
                v
            })
            .collect())
    }
}

/// Log shared by [`Recorder`] agents so tests can see dispatch order.
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Test agent that records its start and end, echoing its input as a summary.
pub struct Recorder {
    pub name: &'static str,
    pub log: EventLog,
    pub delay: Duration,
    pub stall: bool,
}

impl Recorder {
    pub fn new(name: &'static str, log: &EventLog) -> Self {
        Self {
            name,
            log: Arc::clone(log),
            delay: Duration::ZERO,
            stall: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn stalled(mut self) -> Self {
        self.stall = true;
        self
    }
}

const RECORDER_INPUTS: &[InputSpec] = &[InputSpec::optional("any", "Any", "Echoed back.")];

#[async_trait]
impl Agent for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn role(&self) -> &str {
        "Records its invocation."
    }

    fn inputs(&self) -> &[InputSpec] {
        RECORDER_INPUTS
    }

    fn output_description(&self) -> &str {
        "The received input as a summary."
    }

    fn requires(&self) -> &[Dependency] {
        &[]
    }

    async fn handle(
        &self,
        message: AgentMessage,
        _deps: &BoundDependencies<'_>,
    ) -> anyhow::Result<AgentOutput> {
        let step = message.metadata.get("step").cloned().unwrap_or(Value::Null);
        self.log.lock().unwrap().push(format!("start {} {step}", self.name));
        if self.stall {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(self.delay).await;
        self.log.lock().unwrap().push(format!("end {} {step}", self.name));
        Ok(AgentOutput::Summary {
            summary: message.content.to_string(),
        })
    }
}

pub fn plan_json(steps: Value) -> String {
    json!({ "plan": steps }).to_string()
}

pub fn empty_index() -> Arc<dyn SearchIndex> {
    Arc::new(InMemoryIndex::empty(Arc::new(NoopEmbedding)))
}

pub fn deps_with(
    registry: AgentRegistry,
    provider: Arc<dyn Provider>,
    search: Arc<dyn SearchIndex>,
) -> EngineDependencies {
    EngineDependencies::new(Arc::new(registry), SharedDependencies::new(provider, search))
}

pub fn default_deps(provider: Arc<dyn Provider>) -> EngineDependencies {
    deps_with(AgentRegistry::with_default_agents(), provider, empty_index())
}
