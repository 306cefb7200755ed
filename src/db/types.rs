//! Row types for users, conversations and messages

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::llm::{ContentBlock, MessageRole};

use super::error::{DbError, Result};

/// Registered account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
}

/// A titled, ordered sequence of messages owned by one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_saved: bool,
    pub input_tokens: i64,
    pub output_tokens: i64,
}

/// A persisted message; immutable once written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: Vec<ContentBlock>,
    pub created_at: DateTime<Utc>,
    pub input_tokens: i64,
    pub output_tokens: i64,
}

/// Partial conversation update
///
/// Token fields are increments added to the stored counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationUpdate {
    pub title: Option<String>,
    pub is_saved: Option<bool>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
}

impl ConversationUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn saved(is_saved: bool) -> Self {
        Self {
            is_saved: Some(is_saved),
            ..Default::default()
        }
    }

    pub fn tokens(input_tokens: i64, output_tokens: i64) -> Self {
        Self {
            input_tokens: Some(input_tokens),
            output_tokens: Some(output_tokens),
            ..Default::default()
        }
    }
}

/// Current time at the precision timestamps are stored with
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 text, so lexical order matches time order
pub(crate) fn timestamp_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Corrupt(format!("timestamp '{}': {}", text, e)))
}

pub(crate) fn parse_uuid(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).map_err(|e| DbError::Corrupt(format!("uuid '{}': {}", text, e)))
}
