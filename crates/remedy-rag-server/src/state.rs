use anyhow::Result;
use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{KnowledgeBackend, Settings, StoreBackend};
use crate::database::{DbPool, InMemoryMessageStore, MessageStore, PgMessageStore};
use crate::services::conversation::{
    ChatSettings, ContextComposer, ConversationLifecycle, RemedyChatService,
};
use crate::services::knowledge_index::{DisabledKnowledgeIndex, PineconeIndex};
use crate::services::memory::MemoryManager;
use crate::services::providers::{EmbeddingProvider, GenerationProvider, KnowledgeIndex};
use crate::services::{EmbeddingService, LlmService};
use crate::utils::Limiters;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MessageStore>,
    pub lifecycle: Arc<ConversationLifecycle>,
    pub chat: Arc<RemedyChatService>,
}

impl AppState {
    /// Connect the configured backends and wire every service.
    pub async fn build(settings: &Settings) -> Result<Self> {
        let limiters = Limiters::new(&settings.limits);

        let embedding = Arc::new(EmbeddingService::new(settings.embedding.clone(), &limiters));
        info!(
            "Embedding service: {} (dim {})",
            settings.embedding.base_url,
            embedding.dimension()
        );

        let store: Arc<dyn MessageStore> = match settings.memory.backend {
            StoreBackend::Postgres => {
                let pool = DbPool::new(&settings.database).await?;
                let store = PgMessageStore::new(pool, settings.embedding.dimension);
                store.ensure_schema().await?;
                info!("Message store: postgres");
                Arc::new(store)
            }
            StoreBackend::InMemory => {
                info!("Message store: in-memory (not durable)");
                Arc::new(InMemoryMessageStore::new())
            }
        };

        let knowledge: Arc<dyn KnowledgeIndex> = match settings.knowledge.backend {
            KnowledgeBackend::Pinecone => {
                info!("Knowledge index: pinecone at {}", settings.knowledge.host);
                Arc::new(PineconeIndex::new(&settings.knowledge, embedding.clone()))
            }
            KnowledgeBackend::Disabled => {
                info!("Knowledge index: disabled");
                Arc::new(DisabledKnowledgeIndex)
            }
        };

        let generator = Arc::new(LlmService::new(settings.llm.clone()));

        Ok(Self::assemble(
            settings, store, embedding, knowledge, generator, limiters,
        ))
    }

    /// Wire services over already constructed collaborators.
    pub fn assemble(
        settings: &Settings,
        store: Arc<dyn MessageStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        knowledge: Arc<dyn KnowledgeIndex>,
        generator: Arc<dyn GenerationProvider>,
        limiters: Limiters,
    ) -> Self {
        let memory = Arc::new(MemoryManager::new(store.clone(), embedder));

        let lifecycle = Arc::new(ConversationLifecycle::new(
            memory.clone(),
            settings.memory.history_limit,
        ));

        let chat = Arc::new(RemedyChatService::new(
            memory,
            knowledge,
            generator,
            ContextComposer::new(settings.llm.system_prompt.clone(), settings.rag.max_context_tokens),
            limiters,
            ChatSettings {
                short_term_limit: settings.memory.short_term_limit,
                long_term_limit: settings.memory.long_term_limit,
                knowledge_top_k: settings.knowledge.top_k,
                generation_timeout: Duration::from_secs(settings.llm.timeout_seconds),
            },
        ));

        Self {
            store,
            lifecycle,
            chat,
        }
    }
}

impl FromRef<AppState> for Arc<dyn MessageStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Arc<ConversationLifecycle> {
    fn from_ref(state: &AppState) -> Self {
        state.lifecycle.clone()
    }
}

impl FromRef<AppState> for Arc<RemedyChatService> {
    fn from_ref(state: &AppState) -> Self {
        state.chat.clone()
    }
}
