use thiserror::Error;

/// Result type for database operations
pub type Result<T> = std::result::Result<T, DbError>;

/// Errors raised by the persistence layer
#[derive(Debug, Error)]
pub enum DbError {
    /// Connection, constraint and SQL failures
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored JSON that could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A row holds a value that does not parse (bad UUID, timestamp, role)
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A blocking task (password hashing) panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

impl DbError {
    /// True when the error is a UNIQUE constraint violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}
