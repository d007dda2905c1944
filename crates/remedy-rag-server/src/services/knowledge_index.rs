use crate::config::KnowledgeConfig;
use crate::services::memory::Retrieval;
use crate::services::providers::{EmbeddingProvider, KnowledgeIndex};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Label used when the index carries no provenance metadata.
pub const UNKNOWN_SOURCE: &str = "Unknown Source";

/// One ranked passage from the knowledge corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeHit {
    pub context_text: String,
    pub reference_label: String,
}

impl KnowledgeHit {
    pub fn new(context_text: impl Into<String>, reference_label: impl Into<String>) -> Self {
        Self {
            context_text: context_text.into(),
            reference_label: reference_label.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: Vec<f32>,
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

/// Pinecone data-plane client. The query string is embedded with the same
/// model that built the corpus.
pub struct PineconeIndex {
    client: Client,
    host: String,
    api_key: String,
    namespace: Option<String>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl PineconeIndex {
    pub fn new(config: &KnowledgeConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
                .unwrap_or_else(|_| Client::new()),
            host: config.host.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            namespace: config.namespace.clone(),
            embedder,
        }
    }
}

#[async_trait::async_trait]
impl KnowledgeIndex for PineconeIndex {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<KnowledgeHit>> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .context("Failed to embed knowledge query")?;

        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            namespace: self.namespace.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/query", self.host))
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to connect to knowledge index")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Knowledge index error ({}): {}", status, body);
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .context("Failed to parse knowledge index response")?;

        Ok(parsed.matches.into_iter().map(hit_from_metadata).collect())
    }
}

/// Text comes from `text`, then `context`; label from `source`.
fn hit_from_metadata(m: QueryMatch) -> KnowledgeHit {
    let metadata = m.metadata.unwrap_or_default();
    let field = |key: &str| {
        metadata
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    KnowledgeHit {
        context_text: field("text").or_else(|| field("context")).unwrap_or_default(),
        reference_label: field("source").unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
    }
}

/// Used when no knowledge backend is configured.
pub struct DisabledKnowledgeIndex;

#[async_trait::async_trait]
impl KnowledgeIndex for DisabledKnowledgeIndex {
    async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<KnowledgeHit>> {
        Ok(Vec::new())
    }
}

/// Semantic search is best-effort: failures degrade to an empty hit list.
pub async fn search_best_effort(
    index: &dyn KnowledgeIndex,
    query: &str,
    top_k: usize,
) -> Retrieval<Vec<KnowledgeHit>> {
    match index.search(query, top_k).await {
        Ok(mut hits) => {
            hits.truncate(top_k);
            debug!("Knowledge index returned {} hits", hits.len());
            Retrieval::Fresh(hits)
        }
        Err(e) => {
            warn!("Knowledge search failed, continuing without corpus context: {:#}", e);
            Retrieval::degraded(format!("{:#}", e))
        }
    }
}
