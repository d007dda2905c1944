use crate::config::EmbeddingConfig;
use crate::services::providers::EmbeddingProvider;
use crate::utils::limiters::Limiters;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    content: &'a str,
    input: &'a str,
    model: &'a str,
}

/// HTTP client for a llama.cpp / OpenAI compatible embedding server.
#[derive(Clone)]
pub struct EmbeddingService {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
    permits: Arc<Semaphore>,
    acquire_timeout: Duration,
}

impl EmbeddingService {
    pub fn new(config: EmbeddingConfig, limiters: &Limiters) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
            dimension: config.dimension,
            permits: limiters.embedding.clone(),
            acquire_timeout: limiters.acquire_timeout,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_internal(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for {} chars", text.len());

        let (_permit, waited) =
            Limiters::acquire_timed(self.permits.clone(), self.acquire_timeout, "embedding")
                .await?;
        debug!("Embedding permit acquired after {:?}", waited);

        // Send both field names for compatibility
        let request = EmbeddingRequest {
            content: text,
            input: text,
            model: &self.model,
        };

        let url = format!("{}/embedding", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to connect to embedding server")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding API error ({}): {}", status, body);
        }

        let json_value: Value = response
            .json()
            .await
            .context("Failed to parse embedding response as JSON")?;

        let embedding = parse_embedding(&json_value)?;

        if embedding.len() != self.dimension {
            anyhow::bail!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                embedding.len()
            );
        }

        Ok(embedding)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for EmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_internal(text).await
    }
}

/// Accepts `{"embedding": [...]}` (llama.cpp), `{"data": [{"embedding": [...]}]}`
/// (OpenAI), `[{"embedding": [...]}]` and a bare `[...]`.
fn parse_embedding(value: &Value) -> Result<Vec<f32>> {
    let floats = |items: &Vec<Value>| -> Vec<f32> {
        items
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect()
    };

    let embedding = if let Some(arr) = value.as_array() {
        match arr.first() {
            None => anyhow::bail!("Empty array returned from embedding server"),
            Some(first) => match first.get("embedding").and_then(Value::as_array) {
                Some(inner) => floats(inner),
                None => floats(arr),
            },
        }
    } else if let Some(inner) = value.get("embedding").and_then(Value::as_array) {
        floats(inner)
    } else if let Some(inner) = value
        .get("data")
        .and_then(Value::as_array)
        .and_then(|data| data.first())
        .and_then(|first| first.get("embedding"))
        .and_then(Value::as_array)
    {
        floats(inner)
    } else {
        anyhow::bail!("Unrecognized embedding response format: {}", value);
    };

    if embedding.is_empty() {
        anyhow::bail!("Generated embedding is empty");
    }

    Ok(embedding)
}
