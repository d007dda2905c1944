use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::database::{MessageFilter, MessageRecord, MessageStore, Role};
use crate::services::providers::EmbeddingProvider;

use super::clock::TimestampClock;
use super::types::{HistoryEntry, RecordOutcome, Retrieval};

/// Reads and writes conversation memory.
///
/// Writes and reads never fail the caller: write failures come back as
/// [`RecordOutcome::Failed`], read failures as [`Retrieval::Degraded`].
/// Nothing is cached; every read goes to the store.
pub struct MemoryManager {
    store: Arc<dyn MessageStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    clock: TimestampClock,
}

impl MemoryManager {
    pub fn new(store: Arc<dyn MessageStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            clock: TimestampClock::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    /// Embed and persist one turn. The id is derived from
    /// (user, conversation, timestamp, role), so replaying the same write is a no-op.
    pub async fn record_turn(
        &self,
        user: &str,
        conversation: &str,
        role: Role,
        text: &str,
        timestamp: Option<String>,
    ) -> RecordOutcome {
        let timestamp = timestamp.unwrap_or_else(|| self.clock.next());

        let embedding = match self.embedder.embed(text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(
                    "Failed to embed {} turn for conversation {}: {:#}",
                    role, conversation, e
                );
                return RecordOutcome::Failed {
                    cause: format!("{:#}", e),
                };
            }
        };

        let record = MessageRecord::new(user, conversation, role, text, embedding, timestamp);
        let id = record.id.clone();

        match self.store.insert(record).await {
            Ok(true) => {
                debug!("Stored {} turn {} in conversation {}", role, id, conversation);
                RecordOutcome::Stored { id }
            }
            Ok(false) => {
                debug!("Turn {} already stored, retry collapsed", id);
                RecordOutcome::AlreadyPresent { id }
            }
            Err(e) => {
                warn!("Failed to save message {}: {:#}", id, e);
                RecordOutcome::Failed {
                    cause: format!("{:#}", e),
                }
            }
        }
    }

    /// Up to `limit` texts of one conversation, most recent first.
    pub async fn short_term(
        &self,
        user: &str,
        conversation: &str,
        limit: usize,
    ) -> Retrieval<Vec<String>> {
        let filter = MessageFilter::conversation(user, conversation);

        match self.chronological(&filter).await {
            Ok(records) => Retrieval::Fresh(
                records
                    .into_iter()
                    .rev()
                    .take(limit)
                    .map(|r| r.text)
                    .collect(),
            ),
            Err(e) => degrade("short-term memory", e),
        }
    }

    /// Texts from every conversation of `user`.
    ///
    /// With a query: the `limit` most similar records. Without one: every
    /// stored text of the user, unordered and uncapped, so callers must bound
    /// that path themselves.
    pub async fn long_term(
        &self,
        user: &str,
        query_text: Option<&str>,
        limit: usize,
    ) -> Retrieval<Vec<String>> {
        let Some(query) = query_text.filter(|q| !q.is_empty()) else {
            return match self.store.find(&MessageFilter::user(user)).await {
                Ok(records) => Retrieval::Fresh(records.into_iter().map(|r| r.text).collect()),
                Err(e) => degrade("long-term memory", e),
            };
        };

        let embedding = match self.embedder.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => return degrade("long-term memory query embedding", e),
        };

        match self.store.find_similar(user, &embedding, limit).await {
            Ok(hits) => {
                debug!("Long-term memory matched {} records for {}", hits.len(), user);
                Retrieval::Fresh(
                    hits.into_iter()
                        .filter(|h| h.record.user_identity == user)
                        .map(|h| h.record.text)
                        .collect(),
                )
            }
            Err(e) => degrade("long-term memory", e),
        }
    }

    /// Distinct conversation ids the user has records in.
    pub async fn conversation_ids(&self, user: &str) -> Retrieval<BTreeSet<String>> {
        match self.store.find(&MessageFilter::user(user)).await {
            Ok(records) => Retrieval::Fresh(
                records
                    .into_iter()
                    .map(|r| r.conversation_identity)
                    .collect(),
            ),
            Err(e) => degrade("conversation ids", e),
        }
    }

    /// The most recent `limit` turns, returned oldest first.
    pub async fn history(
        &self,
        user: &str,
        conversation: &str,
        limit: usize,
    ) -> Retrieval<Vec<HistoryEntry>> {
        let filter = MessageFilter::conversation(user, conversation);

        match self.chronological(&filter).await {
            Ok(records) => {
                let skip = records.len().saturating_sub(limit);
                Retrieval::Fresh(
                    records
                        .into_iter()
                        .skip(skip)
                        .map(|r| HistoryEntry {
                            role: r.role,
                            message: r.text,
                        })
                        .collect(),
                )
            }
            Err(e) => degrade("conversation history", e),
        }
    }

    /// Stable sort, so equal timestamps keep the store's insertion order.
    async fn chronological(&self, filter: &MessageFilter) -> Result<Vec<MessageRecord>> {
        let mut records = self.store.find(filter).await?;
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(records)
    }
}

fn degrade<T>(what: &str, e: anyhow::Error) -> Retrieval<T> {
    warn!("Failed to fetch {}: {:#}", what, e);
    Retrieval::degraded(format!("{:#}", e))
}
