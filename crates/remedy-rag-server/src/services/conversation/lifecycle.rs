use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::{MessageFilter, Role};
use crate::services::memory::{HistoryEntry, MemoryManager, Retrieval};

use super::types::ConversationSummary;

pub const CONVERSATION_STARTED: &str = "Conversation started";
pub const EMPTY_CONVERSATION: &str = "Empty conversation";
const PREVIEW_CHARS: usize = 80;

/// Create, list, fetch and delete conversations.
///
/// A conversation has no row of its own: it exists while at least one
/// message record carries its id.
pub struct ConversationLifecycle {
    memory: Arc<MemoryManager>,
    history_limit: usize,
}

impl ConversationLifecycle {
    pub fn new(memory: Arc<MemoryManager>, history_limit: usize) -> Self {
        Self {
            memory,
            history_limit,
        }
    }

    /// New conversation id plus a `system` marker record. A failed marker
    /// write is logged; the id is still returned.
    pub async fn start(&self, user: &str) -> String {
        let conversation_id = Uuid::new_v4().to_string();

        let outcome = self
            .memory
            .record_turn(user, &conversation_id, Role::System, CONVERSATION_STARTED, None)
            .await;
        if outcome.is_failed() {
            warn!("Conversation {} started without marker record", conversation_id);
        }

        info!("Started conversation {} for {}", conversation_id, user);
        conversation_id
    }

    pub async fn list(&self, user: &str) -> Retrieval<Vec<ConversationSummary>> {
        let ids = match self.memory.conversation_ids(user).await {
            Retrieval::Fresh(ids) => ids,
            Retrieval::Degraded { cause } => return Retrieval::Degraded { cause },
        };

        let mut summaries = Vec::with_capacity(ids.len());
        for conversation_id in ids {
            let latest = self.memory.short_term(user, &conversation_id, 1).await;
            let preview = match latest.into_value().into_iter().next() {
                Some(text) => preview_of(&text),
                None => EMPTY_CONVERSATION.to_string(),
            };
            summaries.push(ConversationSummary {
                conversation_id,
                preview,
            });
        }

        Retrieval::Fresh(summaries)
    }

    pub async fn fetch(&self, user: &str, conversation: &str) -> Retrieval<Vec<HistoryEntry>> {
        self.memory
            .history(user, conversation, self.history_limit)
            .await
    }

    /// Two-phase: collect matching ids, then delete by id set. Records written
    /// between the two phases survive. No match is success.
    pub async fn delete(&self, user: &str, conversation: &str) -> Result<u64> {
        let deleted = self
            .delete_matching(&MessageFilter::conversation(user, conversation))
            .await
            .with_context(|| format!("Failed to delete conversation {}", conversation))?;

        info!("Deleted {} records of conversation {}", deleted, conversation);
        Ok(deleted)
    }

    pub async fn delete_all(&self, user: &str) -> Result<u64> {
        let deleted = self
            .delete_matching(&MessageFilter::user(user))
            .await
            .context("Failed to delete chat history")?;

        info!("Deleted {} records for {}", deleted, user);
        Ok(deleted)
    }

    async fn delete_matching(&self, filter: &MessageFilter) -> Result<u64> {
        let store = self.memory.store();
        let ids = store.find_ids(filter).await?;
        if ids.is_empty() {
            return Ok(0);
        }
        store.delete_ids(&ids).await
    }
}

fn preview_of(text: &str) -> String {
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{
        InMemoryMessageStore, MessageRecord, MessageStore, MockMessageStore, ScoredMessage,
    };
    use crate::services::providers::EmbeddingProvider;
    use std::sync::Mutex;

    struct ConstantEmbedder;

    #[async_trait::async_trait]
    impl EmbeddingProvider for ConstantEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }
    }

    fn lifecycle_over(store: Arc<dyn MessageStore>) -> (ConversationLifecycle, Arc<MemoryManager>) {
        let memory = Arc::new(MemoryManager::new(store, Arc::new(ConstantEmbedder)));
        (ConversationLifecycle::new(memory.clone(), 50), memory)
    }

    #[tokio::test]
    async fn test_start_writes_marker() {
        let store = InMemoryMessageStore::new();
        let (lifecycle, _) = lifecycle_over(Arc::new(store.clone()));

        let id = lifecycle.start("u@x.com").await;
        assert!(Uuid::parse_str(&id).is_ok());

        let history = lifecycle.fetch("u@x.com", &id).await.into_value();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::System);
        assert_eq!(history[0].message, CONVERSATION_STARTED);
    }

    #[tokio::test]
    async fn test_list_previews_latest_message() {
        let (lifecycle, memory) = lifecycle_over(Arc::new(InMemoryMessageStore::new()));
        let id = lifecycle.start("u@x.com").await;
        let long_reply = "a".repeat(120);
        memory
            .record_turn("u@x.com", &id, Role::Assistant, &long_reply, None)
            .await;

        let listed = lifecycle.list("u@x.com").await.into_value();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].conversation_id, id);
        assert_eq!(listed[0].preview, format!("{}...", "a".repeat(80)));
    }

    #[test]
    fn test_preview_short_text_and_multibyte() {
        assert_eq!(preview_of("hi"), "hi...");
        let text = "é".repeat(100);
        assert_eq!(preview_of(&text).chars().count(), 83);
    }

    #[tokio::test]
    async fn test_delete_then_list() {
        let (lifecycle, _) = lifecycle_over(Arc::new(InMemoryMessageStore::new()));
        let keep = lifecycle.start("u@x.com").await;
        let doomed = lifecycle.start("u@x.com").await;

        assert_eq!(lifecycle.delete("u@x.com", &doomed).await.unwrap(), 1);

        let ids: Vec<String> = lifecycle
            .list("u@x.com")
            .await
            .into_value()
            .into_iter()
            .map(|s| s.conversation_id)
            .collect();
        assert_eq!(ids, vec![keep]);

        // deleting again is a no-op
        assert_eq!(lifecycle.delete("u@x.com", &doomed).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_all_scoped_to_user() {
        let (lifecycle, _) = lifecycle_over(Arc::new(InMemoryMessageStore::new()));
        lifecycle.start("u@x.com").await;
        lifecycle.start("u@x.com").await;
        lifecycle.start("other@x.com").await;

        assert_eq!(lifecycle.delete_all("u@x.com").await.unwrap(), 2);
        assert!(lifecycle.list("u@x.com").await.into_value().is_empty());
        assert_eq!(lifecycle.list("other@x.com").await.into_value().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_store_failure_propagates() {
        let mut store = MockMessageStore::new();
        store
            .expect_find_ids()
            .returning(|_| Err(anyhow::anyhow!("connection reset")));
        let (lifecycle, _) = lifecycle_over(Arc::new(store));

        let err = lifecycle.delete("u@x.com", "c1").await.unwrap_err();
        assert!(format!("{:#}", err).contains("connection reset"));
    }

    /// Store that slips a write in right after the id listing phase.
    struct InterleavingStore {
        inner: InMemoryMessageStore,
        late: Mutex<Option<MessageRecord>>,
    }

    #[async_trait::async_trait]
    impl MessageStore for InterleavingStore {
        async fn insert(&self, record: MessageRecord) -> Result<bool> {
            self.inner.insert(record).await
        }
        async fn find(&self, filter: &MessageFilter) -> Result<Vec<MessageRecord>> {
            self.inner.find(filter).await
        }
        async fn find_ids(&self, filter: &MessageFilter) -> Result<Vec<String>> {
            let ids = self.inner.find_ids(filter).await?;
            let late = self.late.lock().unwrap().take();
            if let Some(record) = late {
                self.inner.insert(record).await?;
            }
            Ok(ids)
        }
        async fn find_similar(
            &self,
            user: &str,
            embedding: &[f32],
            limit: usize,
        ) -> Result<Vec<ScoredMessage>> {
            self.inner.find_similar(user, embedding, limit).await
        }
        async fn delete_ids(&self, ids: &[String]) -> Result<u64> {
            self.inner.delete_ids(ids).await
        }
        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_write_between_phases_survives_delete() {
        let late = MessageRecord::new(
            "u@x.com",
            "c1",
            Role::User,
            "late turn",
            vec![1.0, 0.0, 0.0],
            "2026-01-01T00:00:09Z".to_string(),
        );
        let store = Arc::new(InterleavingStore {
            inner: InMemoryMessageStore::new(),
            late: Mutex::new(Some(late)),
        });
        let (lifecycle, memory) = lifecycle_over(store);
        memory
            .record_turn("u@x.com", "c1", Role::User, "early turn", None)
            .await;

        assert_eq!(lifecycle.delete("u@x.com", "c1").await.unwrap(), 1);

        let remaining = lifecycle.fetch("u@x.com", "c1").await.into_value();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].message, "late turn");
    }
}
