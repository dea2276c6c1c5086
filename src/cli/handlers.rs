use std::sync::Arc;

use anyhow::{Context, Result};
use context_engine::Config;
use context_engine::agents::SharedDependencies;
use context_engine::engine::{AgentRegistry, Engine, EngineDependencies, ExecutionTrace, render};
use context_engine::llm::{OpenAiProvider, Provider, ReliableProvider};
use context_engine::search::{InMemoryIndex, OpenAiEmbedding, SearchIndex};
use tokio_util::sync::CancellationToken;

use super::commands::Commands;

pub async fn dispatch(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Agents => {
            print!("{}", AgentRegistry::with_default_agents().describe_capabilities());
            Ok(())
        }
        Commands::Plan { goal } => {
            let engine = build_engine(&config).await?;
            let plan = engine.plan(&goal).await.context("Planning failed")?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(())
        }
        Commands::Run {
            goal,
            trace_out,
            json,
        } => {
            let engine = build_engine(&config).await?;
            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_ctrl_c.cancel();
                }
            });

            let (output, trace) = engine.run_with_cancel(&goal, &cancel).await;

            if let Some(path) = trace_out {
                let body = serde_json::to_string_pretty(&trace)?;
                tokio::fs::write(&path, body)
                    .await
                    .with_context(|| format!("Failed to write trace to {}", path.display()))?;
            }

            let report = RunReport::new(&trace, output.as_ref(), json)?;
            eprint!("{}", report.stderr);
            print!("{}", report.stdout);

            if output.is_none() {
                anyhow::bail!("Run did not complete: {}", trace.status());
            }
            Ok(())
        }
    }
}

/// What a finished run prints. With `--json` stdout holds only the trace.
struct RunReport {
    stdout: String,
    stderr: String,
}

impl RunReport {
    fn new(trace: &ExecutionTrace, output: Option<&serde_json::Value>, json: bool) -> Result<Self> {
        let text = output.map(|value| format!("{}\n", render_output(value)));
        if json {
            Ok(Self {
                stdout: format!("{}\n", serde_json::to_string_pretty(trace)?),
                stderr: text.unwrap_or_default(),
            })
        } else {
            Ok(Self {
                stdout: text.unwrap_or_default(),
                stderr: trace.summary(),
            })
        }
    }
}

/// Primary text of an agent output mapping, or the whole value rendered.
fn render_output(value: &serde_json::Value) -> String {
    serde_json::from_value::<context_engine::agents::AgentOutput>(value.clone())
        .map_or_else(|_| render(value), |output| output.text().to_string())
}

async fn build_engine(config: &Config) -> Result<Engine> {
    let generation = OpenAiProvider::with_base_url(
        &config.api_url,
        config.api_key.as_deref(),
        &config.generation_model,
        config.temperature,
    );
    let provider: Arc<dyn Provider> = Arc::new(ReliableProvider::new(
        Box::new(generation),
        config.backoff_policy(),
    ));

    let embedder = Arc::new(OpenAiEmbedding::new(
        &config.api_url,
        config.api_key.as_deref().unwrap_or_default(),
        &config.embedding_model,
    ));
    let index = match config.corpus_path() {
        Some(path) => InMemoryIndex::load_corpus(embedder, &path)
            .await
            .with_context(|| format!("Failed to load corpus {}", path.display()))?,
        None => {
            tracing::warn!("No corpus configured; searches will return no matches");
            InMemoryIndex::empty(embedder)
        }
    };
    let search: Arc<dyn SearchIndex> = Arc::new(index);

    let shared = SharedDependencies::new(provider, search).with_namespaces(config.namespaces());
    let deps = EngineDependencies::new(Arc::new(AgentRegistry::with_default_agents()), shared)
        .with_run_timeout(config.run_timeout());
    Ok(Engine::new(deps))
}
