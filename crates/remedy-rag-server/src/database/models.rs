use anyhow::{anyhow, Result};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(anyhow!("Unknown message role: {}", other)),
        }
    }
}

/// One persisted chat turn. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRecord {
    pub id: String,
    pub user_identity: String,
    pub conversation_identity: String,
    pub role: Role,
    pub text: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    /// ISO-8601, the only ordering key
    pub timestamp: String,
}

impl MessageRecord {
    pub fn new(
        user_identity: &str,
        conversation_identity: &str,
        role: Role,
        text: &str,
        embedding: Vec<f32>,
        timestamp: String,
    ) -> Self {
        Self {
            id: Self::derive_id(user_identity, conversation_identity, &timestamp, role),
            user_identity: user_identity.to_string(),
            conversation_identity: conversation_identity.to_string(),
            role,
            text: text.to_string(),
            embedding,
            timestamp,
        }
    }

    /// Same (user, conversation, timestamp, role) always yields the same id,
    /// so a retried write collapses onto the existing record.
    pub fn derive_id(
        user_identity: &str,
        conversation_identity: &str,
        timestamp: &str,
        role: Role,
    ) -> String {
        let mut hasher = Sha256::new();
        for part in [user_identity, conversation_identity, timestamp, role.as_str()] {
            hasher.update(part.as_bytes());
            hasher.update([0x1f]);
        }
        hex::encode(hasher.finalize())
    }
}

/// Conjunctive equality filter over the identity fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFilter {
    pub user_identity: String,
    pub conversation_identity: Option<String>,
}

impl MessageFilter {
    pub fn user(user_identity: &str) -> Self {
        Self {
            user_identity: user_identity.to_string(),
            conversation_identity: None,
        }
    }

    pub fn conversation(user_identity: &str, conversation_identity: &str) -> Self {
        Self {
            user_identity: user_identity.to_string(),
            conversation_identity: Some(conversation_identity.to_string()),
        }
    }

    pub fn matches(&self, record: &MessageRecord) -> bool {
        record.user_identity == self.user_identity
            && self
                .conversation_identity
                .as_ref()
                .map_or(true, |c| *c == record.conversation_identity)
    }
}

#[derive(Debug, Clone)]
pub struct ScoredMessage {
    pub record: MessageRecord,
    pub similarity: f32,
}

#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    pub id: String,
    pub user_identity: String,
    pub conversation_identity: String,
    pub role: String,
    pub message: String,
    pub embedding: Vector,
    pub created_at: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ScoredMessageRow {
    #[sqlx(flatten)]
    pub message: MessageRow,
    pub similarity: f32,
}

impl TryFrom<MessageRow> for MessageRecord {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            user_identity: row.user_identity,
            conversation_identity: row.conversation_identity,
            role: row.role.parse()?,
            text: row.message,
            embedding: row.embedding.to_vec(),
            timestamp: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_id_is_deterministic() {
        let a = MessageRecord::derive_id("a@x.com", "c1", "2026-01-01T00:00:00.000001Z", Role::User);
        let b = MessageRecord::derive_id("a@x.com", "c1", "2026-01-01T00:00:00.000001Z", Role::User);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_derive_id_differs_per_role_and_field_boundary() {
        let ts = "2026-01-01T00:00:00Z";
        let user = MessageRecord::derive_id("a@x.com", "c1", ts, Role::User);
        let assistant = MessageRecord::derive_id("a@x.com", "c1", ts, Role::Assistant);
        assert_ne!(user, assistant);

        // "a-b" + "c" must not collide with "a" + "b-c"
        let left = MessageRecord::derive_id("a-b", "c", ts, Role::User);
        let right = MessageRecord::derive_id("a", "b-c", ts, Role::User);
        assert_ne!(left, right);
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::System, Role::User, Role::Assistant] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("moderator".parse::<Role>().is_err());
    }

    #[test]
    fn test_filter_matches() {
        let record = MessageRecord::new("a@x.com", "c1", Role::User, "hi", vec![], "t".into());
        assert!(MessageFilter::user("a@x.com").matches(&record));
        assert!(MessageFilter::conversation("a@x.com", "c1").matches(&record));
        assert!(!MessageFilter::conversation("a@x.com", "c2").matches(&record));
        assert!(!MessageFilter::user("b@x.com").matches(&record));
    }
}
