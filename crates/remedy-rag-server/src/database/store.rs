use anyhow::Result;

use super::models::{MessageFilter, MessageRecord, ScoredMessage};

/// Durable collection of message records.
///
/// Implementations only promise per-operation atomicity; callers compose
/// multi-step operations (e.g. list ids then delete) without a lock.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    /// Returns `false` when a record with the same id already exists.
    async fn insert(&self, record: MessageRecord) -> Result<bool>;

    /// Records matching the filter, in the store's own order.
    async fn find(&self, filter: &MessageFilter) -> Result<Vec<MessageRecord>>;

    async fn find_ids(&self, filter: &MessageFilter) -> Result<Vec<String>>;

    /// Top `limit` records of one user ranked by cosine similarity.
    async fn find_similar(
        &self,
        user_identity: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredMessage>>;

    async fn delete_ids(&self, ids: &[String]) -> Result<u64>;

    async fn ping(&self) -> Result<()>;
}
