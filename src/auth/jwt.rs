//! HS256 JWT sessions backed by the local user table

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{Database, User};

use super::error::AuthError;
use super::{AuthProvider, AuthSession};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 8;

/// Session token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
}

/// Auth provider issuing signed tokens for users in the chat database
pub struct JwtAuthProvider {
    db: Database,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration: Duration,
}

impl JwtAuthProvider {
    pub fn new(db: Database, secret: &str, expiration_hours: i64) -> Self {
        Self {
            db,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration: Duration::hours(expiration_hours),
        }
    }

    fn create_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: (now + self.expiration).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Token(e.to_string()))
    }

    /// Verify the signature and expiry of a token
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "JWT validation failed");
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                    _ => AuthError::InvalidToken,
                }
            })
    }
}

fn validate_registration(username: &str, email: &str, password: &str) -> Result<(), AuthError> {
    if username.trim().chars().count() < MIN_USERNAME_LEN {
        return Err(AuthError::Validation(
            "Username must be at least 3 characters".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(AuthError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl AuthProvider for JwtAuthProvider {
    async fn authenticate(&self, username: &str, password: &str) -> Result<AuthSession, AuthError> {
        let user = self
            .db
            .users()
            .authenticate(username, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let token = self.create_token(&user)?;
        tracing::info!(user_id = %user.id, "User signed in");
        Ok(AuthSession { user, token })
    }

    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        validate_registration(username, email, password)?;

        let user = self
            .db
            .users()
            .create(username, email, password)
            .await?
            .ok_or(AuthError::UserExists)?;

        let token = self.create_token(&user)?;
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(AuthSession { user, token })
    }

    async fn validate_token(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.decode_claims(token)?;

        self.db
            .users()
            .get_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    async fn refresh_token(&self, token: &str) -> Result<String, AuthError> {
        let user = self.validate_token(token).await?;
        self.create_token(&user)
    }
}
