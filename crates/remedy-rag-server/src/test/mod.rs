//! Router-level tests over the in-memory store and fake collaborators.


use anyhow::Result;
use axum::Router;
use std::sync::Arc;

use crate::config::Settings;
use crate::database::{InMemoryMessageStore, MessageStore};
use crate::models::chat::ChatMessage;
use crate::services::knowledge_index::KnowledgeHit;
use crate::services::providers::{EmbeddingProvider, GenerationProvider, KnowledgeIndex};
use crate::state::AppState;
use crate::utils::Limiters;
use crate::build_router;

pub(crate) const TEST_SETTINGS: &str = r#"
    [server]
    host = "127.0.0.1"
    port = 0

    [logging]
    directory = "logs"

    [database]
    url = "postgres://unused"
    pool_max_size = 1
    pool_timeout_seconds = 1

    [memory]
    backend = "in_memory"

    [embedding]
    base_url = "http://unused"
    model = "letters"
    dimension = 26
    timeout_seconds = 1

    [knowledge]
    backend = "disabled"
    top_k = 3
    timeout_seconds = 1

    [llm]
    base_url = "http://unused"
    model = "echo"
    system_prompt = "You are an Ayurvedic assistant."
    temperature = 0.6
    max_tokens = 64
    timeout_seconds = 2
"#;

/// Bag-of-letters vector, enough for similarity to mean something.
pub(crate) struct LetterEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for LetterEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; 26];
        for c in text.to_lowercase().chars().filter(char::is_ascii_lowercase) {
            v[(c as u8 - b'a') as usize] += 1.0;
        }
        Ok(v)
    }
}

/// Always returns more passages than any sane top_k.
pub(crate) struct FixedKnowledge;

#[async_trait::async_trait]
impl KnowledgeIndex for FixedKnowledge {
    async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<KnowledgeHit>> {
        Ok((1..=5)
            .map(|i| KnowledgeHit::new(format!("Remedy passage {}", i), format!("Text {}", i)))
            .collect())
    }
}

pub(crate) struct EchoGenerator;

#[async_trait::async_trait]
impl GenerationProvider for EchoGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let query = messages
            .last()
            .and_then(|m| m.content.rsplit("User Query:\n").next())
            .unwrap_or_default()
            .trim();
        Ok(format!("For '{}', try warm ginger tea.", query))
    }
}

pub(crate) struct FailingGenerator;

#[async_trait::async_trait]
impl GenerationProvider for FailingGenerator {
    async fn generate(&self, _messages: &[ChatMessage]) -> Result<String> {
        anyhow::bail!("LLM API error: 503 Service Unavailable")
    }
}

pub(crate) fn test_app_with(generator: Arc<dyn GenerationProvider>) -> (Router, InMemoryMessageStore) {
    let settings = Settings::from_toml(TEST_SETTINGS).expect("test settings parse");
    let store = InMemoryMessageStore::new();
    let shared: Arc<dyn MessageStore> = Arc::new(store.clone());

    let state = AppState::assemble(
        &settings,
        shared,
        Arc::new(LetterEmbedder),
        Arc::new(FixedKnowledge),
        generator,
        Limiters::new(&settings.limits),
    );

    (build_router(state), store)
}

pub(crate) fn test_app() -> (Router, InMemoryMessageStore) {
    test_app_with(Arc::new(EchoGenerator))
}
