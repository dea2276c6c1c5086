pub mod embeddings;
pub mod index;
pub mod vector;

pub use embeddings::{EmbeddingProvider, NoopEmbedding, OpenAiEmbedding};
pub use index::{CorpusDocument, InMemoryIndex, SearchIndex, SearchMatch, SearchMetadata};
pub use vector::cosine_similarity;
