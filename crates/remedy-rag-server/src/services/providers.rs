//! Seams to the external collaborators of a chat turn.

use anyhow::Result;

use crate::models::chat::ChatMessage;
use crate::services::knowledge_index::KnowledgeHit;

/// Maps text to a fixed-length vector.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Read-only semantic search over the remedy corpus.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait KnowledgeIndex: Send + Sync {
    /// Up to `top_k` hits in the index's own rank order.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<KnowledgeHit>>;
}

/// Opaque text generation: prompt messages in, reply out.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}
