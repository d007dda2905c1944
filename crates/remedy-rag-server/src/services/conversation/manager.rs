use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::database::Role;
use crate::models::chat::ChatMessage;
use crate::services::knowledge_index::search_best_effort;
use crate::services::memory::MemoryManager;
use crate::services::providers::{GenerationProvider, KnowledgeIndex};
use crate::utils::error::ApiError;
use crate::utils::Limiters;

use super::context_builder::ContextComposer;
use super::types::TurnReply;

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub short_term_limit: usize,
    pub long_term_limit: usize,
    pub knowledge_top_k: usize,
    pub generation_timeout: Duration,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            short_term_limit: 10,
            long_term_limit: 5,
            knowledge_top_k: 3,
            generation_timeout: Duration::from_secs(60),
        }
    }
}

/// Runs one remedy chat turn end to end.
pub struct RemedyChatService {
    memory: Arc<MemoryManager>,
    knowledge: Arc<dyn KnowledgeIndex>,
    generator: Arc<dyn GenerationProvider>,
    composer: ContextComposer,
    limiters: Limiters,
    settings: ChatSettings,
}

impl RemedyChatService {
    pub fn new(
        memory: Arc<MemoryManager>,
        knowledge: Arc<dyn KnowledgeIndex>,
        generator: Arc<dyn GenerationProvider>,
        composer: ContextComposer,
        limiters: Limiters,
        settings: ChatSettings,
    ) -> Self {
        Self {
            memory,
            knowledge,
            generator,
            composer,
            limiters,
            settings,
        }
    }

    /// Save the user turn, retrieve, generate, save the assistant turn.
    ///
    /// Only generation can fail the turn. When it does, the user turn is
    /// already stored and no assistant turn is written.
    pub async fn handle_turn(
        &self,
        user: &str,
        conversation_id: Option<String>,
        query: &str,
    ) -> Result<TurnReply, ApiError> {
        let start_time = Instant::now();
        let conversation_id = conversation_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        info!("Remedy turn for {} in conversation {}", user, conversation_id);

        self.memory
            .record_turn(user, &conversation_id, Role::User, query, None)
            .await;

        let (short_term, long_term, knowledge) = tokio::join!(
            self.memory
                .short_term(user, &conversation_id, self.settings.short_term_limit),
            self.memory
                .long_term(user, Some(query), self.settings.long_term_limit),
            search_best_effort(
                self.knowledge.as_ref(),
                query,
                self.settings.knowledge_top_k
            ),
        );

        if knowledge.is_degraded() || short_term.is_degraded() || long_term.is_degraded() {
            debug!("Composing with degraded retrieval for {}", conversation_id);
        }

        let composed = self.composer.compose(
            &knowledge.into_value(),
            &short_term.into_value(),
            &long_term.into_value(),
            query,
        );
        debug!(
            "Composed context: {} chars, {} references",
            composed.context.len(),
            composed.references.len()
        );

        let messages = composed.messages(self.composer.system_instruction());
        let response = self.generate(&messages).await.map_err(|msg| {
            error!("Generation failed for conversation {}: {}", conversation_id, msg);
            ApiError::GenerationError(msg)
        })?;

        self.memory
            .record_turn(user, &conversation_id, Role::Assistant, &response, None)
            .await;

        info!(
            "Remedy turn completed for {} in {:?}",
            conversation_id,
            start_time.elapsed()
        );

        Ok(TurnReply {
            conversation_id,
            response,
            references: composed.references,
        })
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, String> {
        let (_permit, waited) = Limiters::acquire_timed(
            self.limiters.llm_generate.clone(),
            self.limiters.acquire_timeout,
            "llm_generate",
        )
        .await
        .map_err(|e| format!("{:#}", e))?;
        debug!("Generation permit acquired after {:?}", waited);

        match tokio::time::timeout(
            self.settings.generation_timeout,
            self.generator.generate(messages),
        )
        .await
        {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => Err(format!("{:#}", e)),
            Err(_) => Err(format!(
                "Generation timed out after {:?}",
                self.settings.generation_timeout
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryMessageStore;
    use crate::services::knowledge_index::KnowledgeHit;
    use crate::services::providers::{
        EmbeddingProvider, MockGenerationProvider, MockKnowledgeIndex,
    };
    use anyhow::Result;

    struct ConstantEmbedder;

    #[async_trait::async_trait]
    impl EmbeddingProvider for ConstantEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.5, 0.5])
        }
    }

    struct SlowGenerator;

    #[async_trait::async_trait]
    impl GenerationProvider for SlowGenerator {
        async fn generate(&self, _messages: &[ChatMessage]) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".into())
        }
    }

    fn knowledge_with(hits: Vec<KnowledgeHit>) -> MockKnowledgeIndex {
        let mut index = MockKnowledgeIndex::new();
        index
            .expect_search()
            .returning(move |_, _| Ok(hits.clone()));
        index
    }

    fn service(
        memory: Arc<MemoryManager>,
        knowledge: impl KnowledgeIndex + 'static,
        generator: impl GenerationProvider + 'static,
        settings: ChatSettings,
    ) -> RemedyChatService {
        RemedyChatService::new(
            memory,
            Arc::new(knowledge),
            Arc::new(generator),
            ContextComposer::default(),
            Limiters::default(),
            settings,
        )
    }

    fn memory_over(store: &InMemoryMessageStore) -> Arc<MemoryManager> {
        Arc::new(MemoryManager::new(
            Arc::new(store.clone()),
            Arc::new(ConstantEmbedder),
        ))
    }

    #[tokio::test]
    async fn test_turn_records_both_sides() {
        let store = InMemoryMessageStore::new();
        let memory = memory_over(&store);

        let mut generator = MockGenerationProvider::new();
        generator
            .expect_generate()
            .withf(|messages| {
                messages.len() == 2
                    && messages[1].content.contains("Tulsi reduces fever")
                    && messages[1].content.contains("User Query:\nfever remedy?")
            })
            .times(1)
            .returning(|_| Ok("Drink tulsi tea.".into()));

        let chat = service(
            memory.clone(),
            knowledge_with(vec![KnowledgeHit::new("Tulsi reduces fever", "Charaka")]),
            generator,
            ChatSettings::default(),
        );

        let reply = chat
            .handle_turn("u@x.com", Some("c1".into()), "fever remedy?")
            .await
            .unwrap();

        assert_eq!(reply.conversation_id, "c1");
        assert_eq!(reply.response, "Drink tulsi tea.");
        assert_eq!(reply.references, vec!["Charaka"]);

        let history = memory.history("u@x.com", "c1", 50).await.into_value();
        let roles: Vec<Role> = history.iter().map(|h| h.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_user_turn_visible_to_retrieval() {
        let store = InMemoryMessageStore::new();
        let memory = memory_over(&store);

        let mut generator = MockGenerationProvider::new();
        generator
            .expect_generate()
            .withf(|messages| messages[1].content.contains("Context:\nhow to sleep better"))
            .returning(|_| Ok("Warm milk with nutmeg.".into()));

        let chat = service(memory, knowledge_with(vec![]), generator, ChatSettings::default());
        let reply = chat
            .handle_turn("u@x.com", Some("c1".into()), "how to sleep better")
            .await;
        assert!(reply.is_ok());
    }

    #[tokio::test]
    async fn test_missing_conversation_id_gets_fresh_uuid() {
        let store = InMemoryMessageStore::new();
        let mut generator = MockGenerationProvider::new();
        generator.expect_generate().returning(|_| Ok("ok".into()));

        let chat = service(
            memory_over(&store),
            knowledge_with(vec![]),
            generator,
            ChatSettings::default(),
        );
        let reply = chat.handle_turn("u@x.com", None, "hello").await.unwrap();

        assert!(Uuid::parse_str(&reply.conversation_id).is_ok());
        // user + assistant, no start marker
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_user_turn() {
        let store = InMemoryMessageStore::new();
        let memory = memory_over(&store);

        let mut generator = MockGenerationProvider::new();
        generator
            .expect_generate()
            .returning(|_| Err(anyhow::anyhow!("LLM API error: 503")));

        let chat = service(memory.clone(), knowledge_with(vec![]), generator, ChatSettings::default());
        let err = chat
            .handle_turn("u@x.com", Some("c1".into()), "headache")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::GenerationError(ref msg) if msg.contains("503")));

        let history = memory.history("u@x.com", "c1", 50).await.into_value();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].message, "headache");
    }

    #[tokio::test]
    async fn test_generation_timeout() {
        let store = InMemoryMessageStore::new();
        let settings = ChatSettings {
            generation_timeout: Duration::from_millis(20),
            ..ChatSettings::default()
        };

        let chat = service(memory_over(&store), knowledge_with(vec![]), SlowGenerator, settings);
        let err = chat
            .handle_turn("u@x.com", Some("c1".into()), "q")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::GenerationError(ref msg) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn test_knowledge_failure_does_not_fail_turn() {
        let store = InMemoryMessageStore::new();
        let mut index = MockKnowledgeIndex::new();
        index
            .expect_search()
            .returning(|_, _| Err(anyhow::anyhow!("index unreachable")));
        let mut generator = MockGenerationProvider::new();
        generator.expect_generate().returning(|_| Ok("Rest well.".into()));

        let chat = service(memory_over(&store), index, generator, ChatSettings::default());
        let reply = chat
            .handle_turn("u@x.com", Some("c1".into()), "tired")
            .await
            .unwrap();

        assert!(reply.references.is_empty());
        assert_eq!(reply.response, "Rest well.");
    }

    #[tokio::test]
    async fn test_references_capped_at_top_k() {
        let store = InMemoryMessageStore::new();
        let hits = (0..6)
            .map(|i| KnowledgeHit::new(format!("passage {}", i), format!("Text {}", i)))
            .collect();
        let mut generator = MockGenerationProvider::new();
        generator.expect_generate().returning(|_| Ok("ok".into()));

        let chat = service(
            memory_over(&store),
            knowledge_with(hits),
            generator,
            ChatSettings::default(),
        );
        let reply = chat.handle_turn("u@x.com", None, "q").await.unwrap();

        assert_eq!(reply.references, vec!["Text 0", "Text 1", "Text 2"]);
    }
}
