use anyhow::Result;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use super::models::{MessageFilter, MessageRecord, ScoredMessage};
use super::store::MessageStore;
use crate::utils::similarity::top_k_by_similarity;

/// Process-local message store, partitioned by user identity.
///
/// Each partition keeps insertion order, which is the tie-breaker for equal
/// timestamps. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct InMemoryMessageStore {
    partitions: Arc<DashMap<String, Vec<MessageRecord>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn insert(&self, record: MessageRecord) -> Result<bool> {
        let mut partition = self
            .partitions
            .entry(record.user_identity.clone())
            .or_default();

        if partition.iter().any(|existing| existing.id == record.id) {
            debug!("Message {} already stored, skipping", record.id);
            return Ok(false);
        }

        partition.push(record);
        Ok(true)
    }

    async fn find(&self, filter: &MessageFilter) -> Result<Vec<MessageRecord>> {
        let records = self
            .partitions
            .get(&filter.user_identity)
            .map(|partition| {
                partition
                    .iter()
                    .filter(|r| filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(records)
    }

    async fn find_ids(&self, filter: &MessageFilter) -> Result<Vec<String>> {
        let ids = self
            .partitions
            .get(&filter.user_identity)
            .map(|partition| {
                partition
                    .iter()
                    .filter(|r| filter.matches(r))
                    .map(|r| r.id.clone())
                    .collect()
            })
            .unwrap_or_default();

        Ok(ids)
    }

    async fn find_similar(
        &self,
        user_identity: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredMessage>> {
        let candidates: Vec<MessageRecord> = self
            .partitions
            .get(user_identity)
            .map(|partition| partition.value().clone())
            .unwrap_or_default();

        let ranked = top_k_by_similarity(
            embedding,
            candidates.into_iter().map(|r| {
                let vector = r.embedding.clone();
                (r, vector)
            }),
            limit,
        );

        Ok(ranked
            .into_iter()
            .map(|(record, similarity)| ScoredMessage { record, similarity })
            .collect())
    }

    async fn delete_ids(&self, ids: &[String]) -> Result<u64> {
        let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut removed = 0u64;

        for mut partition in self.partitions.iter_mut() {
            let before = partition.len();
            partition.retain(|r| !targets.contains(r.id.as_str()));
            removed += (before - partition.len()) as u64;
        }
        self.partitions.retain(|_, partition| !partition.is_empty());

        Ok(removed)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
