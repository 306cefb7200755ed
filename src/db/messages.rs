//! Conversation messages

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::chat::content::normalize_content;
use crate::llm::{ContentBlock, Message, MessageRole};

use super::error::{DbError, Result};
use super::types::{now, parse_timestamp, parse_uuid, timestamp_text, StoredMessage};

type MessageRow = (String, String, String, String, String, i64, i64);

pub struct MessageRepo {
    pool: SqlitePool,
}

impl MessageRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a message; content is stored as a JSON array of typed blocks
    pub async fn add(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &[ContentBlock],
        input_tokens: i64,
        output_tokens: i64,
    ) -> Result<StoredMessage> {
        let message = StoredMessage {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            content: content.to_vec(),
            created_at: now(),
            input_tokens,
            output_tokens,
        };
        let content_json = serde_json::to_string(&message.content)?;

        sqlx::query(
            "INSERT INTO messages \
             (id, conversation_id, role, content, created_at, input_tokens, output_tokens) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id.to_string())
        .bind(conversation_id.to_string())
        .bind(role.as_str())
        .bind(&content_json)
        .bind(timestamp_text(message.created_at))
        .bind(input_tokens)
        .bind(output_tokens)
        .execute(&self.pool)
        .await?;

        Ok(message)
    }

    /// All messages of a conversation in creation order
    pub async fn list(&self, conversation_id: Uuid) -> Result<Vec<StoredMessage>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, conversation_id, role, content, created_at, input_tokens, output_tokens \
             FROM messages WHERE conversation_id = ? \
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_message).collect()
    }

    /// The conversation history in provider message form
    pub async fn list_for_api(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        Ok(self
            .list(conversation_id)
            .await?
            .into_iter()
            .map(|m| Message {
                role: m.role,
                content: m.content,
            })
            .collect())
    }
}

fn row_to_message(row: MessageRow) -> Result<StoredMessage> {
    let role: MessageRole = row.2.parse().map_err(DbError::Corrupt)?;
    let content: serde_json::Value = serde_json::from_str(&row.3)?;

    Ok(StoredMessage {
        id: parse_uuid(&row.0)?,
        conversation_id: parse_uuid(&row.1)?,
        role,
        content: normalize_content(content),
        created_at: parse_timestamp(&row.4)?,
        input_tokens: row.5,
        output_tokens: row.6,
    })
}
