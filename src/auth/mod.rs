//! Authentication
//!
//! The server depends on the [`AuthProvider`] trait only; the JWT provider
//! backed by the local user table is the default implementation and can be
//! replaced by a directory-backed one without touching the routes.

pub mod error;
pub mod jwt;
pub mod password;

use async_trait::async_trait;
use serde::Serialize;

use crate::db::User;

pub use error::AuthError;
pub use jwt::{Claims, JwtAuthProvider};

/// Name of the HttpOnly session cookie
pub const SESSION_COOKIE: &str = "chat_token";

/// A signed-in user and their session token
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Check credentials and open a session
    async fn authenticate(&self, username: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// Create an account and open a session for it
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError>;

    /// The user behind a valid, unexpired token
    async fn validate_token(&self, token: &str) -> Result<User, AuthError>;

    /// A fresh token for a still-valid one
    async fn refresh_token(&self, token: &str) -> Result<String, AuthError>;
}
