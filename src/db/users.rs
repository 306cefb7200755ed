//! User accounts

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};

use super::error::{DbError, Result};
use super::types::{now, parse_timestamp, parse_uuid, timestamp_text, User};

type UserRow = (String, String, String, String, String, i64, i64);

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, \
                            total_input_tokens, total_output_tokens";

pub struct UserRepo {
    pool: SqlitePool,
}

impl UserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user with a freshly hashed password
    ///
    /// Username and email are stored lower-cased. Returns `None` when
    /// either is already taken.
    pub async fn create(&self, username: &str, email: &str, password: &str) -> Result<Option<User>> {
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await?;

        let user = User {
            id: Uuid::new_v4(),
            username: username.trim().to_lowercase(),
            email: email.trim().to_lowercase(),
            password_hash,
            created_at: now(),
            total_input_tokens: 0,
            total_output_tokens: 0,
        };

        let result = sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(timestamp_text(user.created_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Some(user)),
            Err(e) => {
                let err = DbError::from(e);
                if err.is_unique_violation() {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(row_to_user).transpose()
    }

    /// Case-insensitive lookup
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))
                .bind(username.trim().to_lowercase())
                .fetch_optional(&self.pool)
                .await?;

        row.map(row_to_user).transpose()
    }

    /// The user, if the username exists and the password matches
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.get_by_username(username).await? else {
            return Ok(None);
        };

        let password = password.to_string();
        let password_hash = user.password_hash.clone();
        let matches =
            tokio::task::spawn_blocking(move || verify_password(&password, &password_hash)).await?;

        Ok(matches.then_some(user))
    }

    /// Add to the user's all-time token counters
    pub async fn add_tokens(&self, id: Uuid, input_tokens: i64, output_tokens: i64) -> Result<()> {
        sqlx::query(
            "UPDATE users \
             SET total_input_tokens = total_input_tokens + ?, \
                 total_output_tokens = total_output_tokens + ? \
             WHERE id = ?",
        )
        .bind(input_tokens)
        .bind(output_tokens)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_user(row: UserRow) -> Result<User> {
    Ok(User {
        id: parse_uuid(&row.0)?,
        username: row.1,
        email: row.2,
        password_hash: row.3,
        created_at: parse_timestamp(&row.4)?,
        total_input_tokens: row.5,
        total_output_tokens: row.6,
    })
}
