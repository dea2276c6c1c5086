use super::embeddings::EmbeddingProvider;
use super::vector::cosine_similarity;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Metadata attached to an indexed chunk. Agents rely on `text`, `source`
/// and `blueprint_json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub blueprint_json: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub id: String,
    pub score: f32,
    pub metadata: SearchMetadata,
}

/// Vector search over namespaced chunks. Results are ordered by descending score.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(&self, query: &str, namespace: &str, top_k: usize)
    -> Result<Vec<SearchMatch>>;
}

/// One entry of a JSON corpus file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub id: String,
    pub namespace: String,
    pub text: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub blueprint_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CorpusFile {
    documents: Vec<CorpusDocument>,
}

struct IndexedChunk {
    document: CorpusDocument,
    vector: Vec<f32>,
}

/// Brute-force cosine index held in memory. Immutable after construction.
pub struct InMemoryIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    chunks: Vec<IndexedChunk>,
}

impl InMemoryIndex {
    pub fn empty(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            chunks: Vec::new(),
        }
    }

    /// Embed every document once and keep the vectors alongside it.
    pub async fn from_documents(
        embedder: Arc<dyn EmbeddingProvider>,
        documents: Vec<CorpusDocument>,
    ) -> Result<Self> {
        if documents.is_empty() {
            return Ok(Self::empty(embedder));
        }

        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let vectors = embedder
            .embed(&texts)
            .await
            .context("Failed to embed corpus documents")?;

        if vectors.len() != documents.len() {
            anyhow::bail!(
                "embedding provider returned {} vectors for {} documents",
                vectors.len(),
                documents.len()
            );
        }

        let chunks = documents
            .into_iter()
            .zip(vectors)
            .map(|(document, vector)| IndexedChunk { document, vector })
            .collect::<Vec<_>>();

        tracing::info!(chunks = chunks.len(), "Search index loaded");
        Ok(Self { embedder, chunks })
    }

    pub async fn load_corpus(embedder: Arc<dyn EmbeddingProvider>, path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read corpus file {}", path.display()))?;
        let corpus: CorpusFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse corpus file {}", path.display()))?;
        Self::from_documents(embedder, corpus.documents).await
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[async_trait]
impl SearchIndex for InMemoryIndex {
    async fn search(
        &self,
        query: &str,
        namespace: &str,
        top_k: usize,
    ) -> Result<Vec<SearchMatch>> {
        if top_k == 0 || !self.chunks.iter().any(|c| c.document.namespace == namespace) {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_one(query).await?;

        let mut matches: Vec<SearchMatch> = self
            .chunks
            .iter()
            .filter(|chunk| chunk.document.namespace == namespace)
            .map(|chunk| SearchMatch {
                id: chunk.document.id.clone(),
                score: cosine_similarity(&query_vector, &chunk.vector),
                metadata: SearchMetadata {
                    text: Some(chunk.document.text.clone()),
                    source: chunk.document.source.clone(),
                    blueprint_json: chunk.document.blueprint_json.clone(),
                },
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        matches.truncate(top_k);

        tracing::debug!(namespace, hits = matches.len(), "Search completed");
        Ok(matches)
    }
}
