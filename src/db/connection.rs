//! SQLite pool setup and schema initialization

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

use super::conversations::ConversationRepo;
use super::error::Result;
use super::messages::MessageRepo;
use super::users::UserRepo;

const SCHEMA: &str = include_str!("schema.sql");

/// Handle to the chat database
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) a database file and initialize the schema
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        tracing::info!(path = %path.display(), "Opened database");

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Private in-memory database, used by tests
    ///
    /// A single connection that never expires keeps the database alive for
    /// the lifetime of the pool.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub fn users(&self) -> UserRepo {
        UserRepo::new(self.pool.clone())
    }

    pub fn conversations(&self) -> ConversationRepo {
        ConversationRepo::new(self.pool.clone())
    }

    pub fn messages(&self) -> MessageRepo {
        MessageRepo::new(self.pool.clone())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
