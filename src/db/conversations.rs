//! Conversations and their token counters

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::config::DEFAULT_TITLE;

use super::error::Result;
use super::types::{now, parse_timestamp, parse_uuid, timestamp_text, Conversation, ConversationUpdate};

type ConversationRow = (String, String, String, String, String, bool, i64, i64);

const CONVERSATION_COLUMNS: &str = "id, user_id, title, created_at, updated_at, is_saved, \
                                    input_tokens, output_tokens";

pub struct ConversationRepo {
    pool: SqlitePool,
}

impl ConversationRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a conversation; `None` uses the default title
    pub async fn create(&self, user_id: Uuid, title: Option<&str>) -> Result<Conversation> {
        let created_at = now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_id,
            title: title.unwrap_or(DEFAULT_TITLE).to_string(),
            created_at,
            updated_at: created_at,
            is_saved: false,
            input_tokens: 0,
            output_tokens: 0,
        };

        sqlx::query(
            "INSERT INTO conversations (id, user_id, title, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(conversation.id.to_string())
        .bind(user_id.to_string())
        .bind(&conversation.title)
        .bind(timestamp_text(created_at))
        .bind(timestamp_text(created_at))
        .execute(&self.pool)
        .await?;

        Ok(conversation)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Conversation>> {
        let row: Option<ConversationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM conversations WHERE id = ?",
            CONVERSATION_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_conversation).transpose()
    }

    /// The user's conversations, most recently updated first
    pub async fn list_for_user(&self, user_id: Uuid, saved_only: bool) -> Result<Vec<Conversation>> {
        let filter = if saved_only { " AND is_saved = 1" } else { "" };
        let rows: Vec<ConversationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM conversations WHERE user_id = ?{} \
             ORDER BY updated_at DESC, rowid DESC",
            CONVERSATION_COLUMNS, filter
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_conversation).collect()
    }

    /// Apply a partial update; `updated_at` is bumped every time
    ///
    /// Returns false when no such conversation exists.
    pub async fn update(&self, id: Uuid, update: &ConversationUpdate) -> Result<bool> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE conversations SET ");
        let mut fields = query.separated(", ");

        if let Some(title) = &update.title {
            fields.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(is_saved) = update.is_saved {
            fields.push("is_saved = ").push_bind_unseparated(is_saved);
        }
        if let Some(input_tokens) = update.input_tokens {
            fields
                .push("input_tokens = input_tokens + ")
                .push_bind_unseparated(input_tokens);
        }
        if let Some(output_tokens) = update.output_tokens {
            fields
                .push("output_tokens = output_tokens + ")
                .push_bind_unseparated(output_tokens);
        }
        fields
            .push("updated_at = ")
            .push_bind_unseparated(timestamp_text(now()));

        query.push(" WHERE id = ").push_bind(id.to_string());

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a conversation and its messages in one transaction
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM messages WHERE conversation_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_conversation(row: ConversationRow) -> Result<Conversation> {
    Ok(Conversation {
        id: parse_uuid(&row.0)?,
        user_id: parse_uuid(&row.1)?,
        title: row.2,
        created_at: parse_timestamp(&row.3)?,
        updated_at: parse_timestamp(&row.4)?,
        is_saved: row.5,
        input_tokens: row.6,
        output_tokens: row.7,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, User};
    use crate::llm::{ContentBlock, MessageRole};

    async fn setup() -> (Database, User) {
        let db = Database::in_memory().await.unwrap();
        let user = db
            .users()
            .create("erin", "erin@example.com", "password1")
            .await
            .unwrap()
            .unwrap();
        (db, user)
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let (db, user) = setup().await;

        let conv = db.conversations().create(user.id, None).await.unwrap();
        assert_eq!(conv.title, "New Chat");
        assert!(!conv.is_saved);
        assert_eq!(conv.input_tokens, 0);

        let fetched = db.conversations().get(conv.id).await.unwrap().unwrap();
        assert_eq!(fetched, conv);
        assert_eq!(fetched.user_id, user.id);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (db, _) = setup().await;
        assert!(db.conversations().get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_orders_by_most_recent_update() {
        let (db, user) = setup().await;
        let repo = db.conversations();

        let first = repo.create(user.id, Some("first")).await.unwrap();
        let second = repo.create(user.id, Some("second")).await.unwrap();
        let third = repo.create(user.id, Some("third")).await.unwrap();

        // Touching the oldest moves it to the top
        repo.update(first.id, &ConversationUpdate::default()).await.unwrap();

        let ids: Vec<Uuid> = repo
            .list_for_user(user.id, false)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![first.id, third.id, second.id]);
    }

    #[tokio::test]
    async fn test_list_saved_only() {
        let (db, user) = setup().await;
        let repo = db.conversations();

        let kept = repo.create(user.id, None).await.unwrap();
        repo.create(user.id, None).await.unwrap();
        repo.update(kept.id, &ConversationUpdate::saved(true)).await.unwrap();

        let saved = repo.list_for_user(user.id, true).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, kept.id);
        assert!(saved[0].is_saved);
        assert_eq!(repo.list_for_user(user.id, false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_increments_tokens_and_bumps_updated_at() {
        let (db, user) = setup().await;
        let repo = db.conversations();
        let conv = repo.create(user.id, None).await.unwrap();

        repo.update(conv.id, &ConversationUpdate::tokens(10, 3)).await.unwrap();
        repo.update(conv.id, &ConversationUpdate::tokens(5, 2)).await.unwrap();
        repo.update(conv.id, &ConversationUpdate::title("Renamed")).await.unwrap();

        let updated = repo.get(conv.id).await.unwrap().unwrap();
        assert_eq!(updated.input_tokens, 15);
        assert_eq!(updated.output_tokens, 5);
        assert_eq!(updated.title, "Renamed");
        assert!(updated.updated_at >= conv.updated_at);
        assert_eq!(updated.created_at.timestamp_micros(), conv.created_at.timestamp_micros());
    }

    #[tokio::test]
    async fn test_update_missing_returns_false() {
        let (db, _) = setup().await;
        let changed = db
            .conversations()
            .update(Uuid::new_v4(), &ConversationUpdate::title("x"))
            .await
            .unwrap();
        assert!(!changed);
    }

    #[tokio::test]
    async fn test_delete_removes_messages() {
        let (db, user) = setup().await;
        let conv = db.conversations().create(user.id, None).await.unwrap();
        db.messages()
            .add(conv.id, MessageRole::User, &[ContentBlock::text("hi")], 0, 0)
            .await
            .unwrap();

        assert!(db.conversations().delete(conv.id).await.unwrap());
        assert!(db.conversations().get(conv.id).await.unwrap().is_none());
        assert!(db.messages().list(conv.id).await.unwrap().is_empty());
        assert!(!db.conversations().delete(conv.id).await.unwrap());
    }
}
