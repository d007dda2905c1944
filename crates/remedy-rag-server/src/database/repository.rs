use super::models::{MessageFilter, MessageRecord, MessageRow, ScoredMessage, ScoredMessageRow};
use super::store::MessageStore;
use super::DbPool;
use anyhow::{Context, Result};
use pgvector::Vector;
use tracing::{debug, info};

/// PostgreSQL + pgvector backed message store.
pub struct PgMessageStore {
    pool: DbPool,
    dimension: usize,
}

impl PgMessageStore {
    pub fn new(pool: DbPool, dimension: usize) -> Self {
        Self { pool, dimension }
    }

    /// Create the extension, table and indexes if they are missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        let pool = self.pool.get_pool();

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(pool)
            .await
            .context("Failed to enable pgvector extension")?;

        let create_table = format!(
            r#"CREATE TABLE IF NOT EXISTS rag_chat_messages (
                seq BIGSERIAL,
                id TEXT PRIMARY KEY,
                user_identity TEXT NOT NULL,
                conversation_identity TEXT NOT NULL,
                role TEXT NOT NULL,
                message TEXT NOT NULL,
                embedding vector({}) NOT NULL,
                created_at TEXT NOT NULL
            )"#,
            self.dimension
        );
        sqlx::query(&create_table)
            .execute(pool)
            .await
            .context("Failed to create rag_chat_messages")?;

        sqlx::query(
            r#"CREATE INDEX IF NOT EXISTS idx_rag_chat_messages_owner
               ON rag_chat_messages (user_identity, conversation_identity)"#,
        )
        .execute(pool)
        .await?;

        info!("✅ Message store schema ready (dimension {})", self.dimension);
        Ok(())
    }
}

#[async_trait::async_trait]
impl MessageStore for PgMessageStore {
    async fn insert(&self, record: MessageRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"INSERT INTO rag_chat_messages
                (id, user_identity, conversation_identity, role, message, embedding, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT (id) DO NOTHING"#,
        )
        .bind(&record.id)
        .bind(&record.user_identity)
        .bind(&record.conversation_identity)
        .bind(record.role.as_str())
        .bind(&record.text)
        .bind(Vector::from(record.embedding))
        .bind(&record.timestamp)
        .execute(self.pool.get_pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find(&self, filter: &MessageFilter) -> Result<Vec<MessageRecord>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"SELECT
                id,
                user_identity,
                conversation_identity,
                role,
                message,
                embedding,
                created_at
               FROM rag_chat_messages
               WHERE user_identity = $1
                 AND ($2::text IS NULL OR conversation_identity = $2)
               ORDER BY seq"#,
        )
        .bind(&filter.user_identity)
        .bind(filter.conversation_identity.as_deref())
        .fetch_all(self.pool.get_pool())
        .await?;

        debug!("Fetched {} messages for {:?}", rows.len(), filter);

        rows.into_iter().map(MessageRecord::try_from).collect()
    }

    async fn find_ids(&self, filter: &MessageFilter) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"SELECT id FROM rag_chat_messages
               WHERE user_identity = $1
                 AND ($2::text IS NULL OR conversation_identity = $2)"#,
        )
        .bind(&filter.user_identity)
        .bind(filter.conversation_identity.as_deref())
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(ids)
    }

    async fn find_similar(
        &self,
        user_identity: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredMessage>> {
        let rows = sqlx::query_as::<_, ScoredMessageRow>(
            r#"SELECT
                id,
                user_identity,
                conversation_identity,
                role,
                message,
                embedding,
                created_at,
                (1 - (embedding <=> $2))::float4 AS similarity
               FROM rag_chat_messages
               WHERE user_identity = $1
               ORDER BY embedding <=> $2
               LIMIT $3"#,
        )
        .bind(user_identity)
        .bind(Vector::from(embedding.to_vec()))
        .bind(limit as i64)
        .fetch_all(self.pool.get_pool())
        .await?;

        debug!("Found {} similar messages for {}", rows.len(), user_identity);

        rows.into_iter()
            .map(|row| {
                Ok(ScoredMessage {
                    similarity: row.similarity,
                    record: MessageRecord::try_from(row.message)?,
                })
            })
            .collect()
    }

    async fn delete_ids(&self, ids: &[String]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM rag_chat_messages WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .execute(self.pool.get_pool())
            .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(self.pool.get_pool()).await?;
        Ok(())
    }
}
