use thiserror::Error;

use crate::db::DbError;

/// Authentication failures
///
/// Display strings are shown to the user as-is.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Registration input rejected
    #[error("{0}")]
    Validation(String),

    #[error("Username or email already exists")]
    UserExists,

    /// Missing, malformed, forged, or for a user that no longer exists
    #[error("Invalid or missing session token")]
    InvalidToken,

    #[error("Session has expired")]
    ExpiredToken,

    /// Signing failure
    #[error("Token error: {0}")]
    Token(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl AuthError {
    /// True for errors that mean "not signed in" rather than a server fault
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::ExpiredToken
        )
    }
}
