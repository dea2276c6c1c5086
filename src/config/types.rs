use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agents::Namespaces;
use crate::error::ConfigError;
use crate::llm::BackoffPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub namespaces: NamespaceConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub corpus: CorpusConfig,
}

fn default_api_url() -> String {
    crate::llm::openai::DEFAULT_API_URL.into()
}

fn default_generation_model() -> String {
    "gpt-4o".into()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

fn default_temperature() -> f64 {
    0.1
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            api_key: None,
            api_url: default_api_url(),
            generation_model: default_generation_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            log_level: default_log_level(),
            namespaces: NamespaceConfig::default(),
            reliability: ReliabilityConfig::default(),
            engine: EngineConfig::default(),
            corpus: CorpusConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Validation(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        if self.reliability.provider_retries == 0 {
            return Err(ConfigError::Validation(
                "reliability.provider_retries must be at least 1".into(),
            ));
        }
        if self.reliability.backoff_min_ms > self.reliability.backoff_max_ms {
            return Err(ConfigError::Validation(format!(
                "reliability.backoff_min_ms ({}) exceeds backoff_max_ms ({})",
                self.reliability.backoff_min_ms, self.reliability.backoff_max_ms
            )));
        }
        if self.namespaces.context.trim().is_empty()
            || self.namespaces.knowledge.trim().is_empty()
        {
            return Err(ConfigError::Validation("namespaces must not be empty".into()));
        }
        self.tracing_level()?;
        Ok(())
    }

    pub fn tracing_level(&self) -> Result<tracing::Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::Validation(format!("unknown log_level '{}'", self.log_level)))
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts: self.reliability.provider_retries,
            min_delay: Duration::from_millis(self.reliability.backoff_min_ms),
            max_delay: Duration::from_millis(self.reliability.backoff_max_ms),
        }
    }

    pub fn namespaces(&self) -> Namespaces {
        Namespaces {
            context: self.namespaces.context.clone(),
            knowledge: self.namespaces.knowledge.clone(),
        }
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.engine
            .run_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Corpus file with `~` expanded, if configured.
    pub fn corpus_path(&self) -> Option<PathBuf> {
        self.corpus
            .path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceConfig {
    #[serde(default = "default_context_namespace")]
    pub context: String,
    #[serde(default = "default_knowledge_namespace")]
    pub knowledge: String,
}

fn default_context_namespace() -> String {
    Namespaces::default().context
}

fn default_knowledge_namespace() -> String {
    Namespaces::default().knowledge
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            context: default_context_namespace(),
            knowledge: default_knowledge_namespace(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    /// Total generation attempts, first try included.
    #[serde(default = "default_provider_retries")]
    pub provider_retries: u32,
    #[serde(default = "default_backoff_min_ms")]
    pub backoff_min_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

fn default_provider_retries() -> u32 {
    6
}

fn default_backoff_min_ms() -> u64 {
    1_000
}

fn default_backoff_max_ms() -> u64 {
    60_000
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            provider_retries: default_provider_retries(),
            backoff_min_ms: default_backoff_min_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Wall-clock limit for a whole run. Unset or 0 means no limit.
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// JSON corpus loaded into the in-memory index.
    #[serde(default)]
    pub path: Option<String>,
}
