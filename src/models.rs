// Request and response bodies of the HTTP API

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{AppConfig, ALLOWED_EXTENSIONS, APP_FULL_NAME, APP_NAME, APP_VERSION, MAX_FILE_SIZE_MB};
use crate::db::User;

// Auth
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub password_confirm: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub expires_in_hours: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_in_hours: i64,
}

// Conversations
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListConversationsQuery {
    #[serde(default)]
    pub saved: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateConversationRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_saved: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

// Usage
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageQuery {
    #[serde(default)]
    pub conversation_id: Option<Uuid>,
}

/// Sidebar info
#[derive(Debug, Clone, Serialize)]
pub struct InfoResponse {
    pub name: &'static str,
    pub full_name: &'static str,
    pub version: &'static str,
    pub backend: String,
    pub model: &'static str,
    pub max_file_size_mb: usize,
    pub allowed_extensions: Vec<&'static str>,
}

impl From<&AppConfig> for InfoResponse {
    fn from(config: &AppConfig) -> Self {
        Self {
            name: APP_NAME,
            full_name: APP_FULL_NAME,
            version: APP_VERSION,
            backend: config.backend_display_name(),
            model: config.model.display_name(),
            max_file_size_mb: MAX_FILE_SIZE_MB,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|(ext, _)| *ext).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_without_confirmation() {
        let json = r#"{"username":"alice","email":"a@example.com","password":"secret123"}"#;
        let request: RegisterRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.username, "alice");
        assert!(request.password_confirm.is_none());
    }

    #[test]
    fn test_update_request_partial_fields() {
        let request: UpdateConversationRequest = serde_json::from_str(r#"{"is_saved":true}"#).unwrap();
        assert_eq!(request.is_saved, Some(true));
        assert!(request.title.is_none());
    }

    #[test]
    fn test_info_response() {
        let info = InfoResponse::from(&AppConfig::default());
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["name"], "CHAT");
        assert_eq!(value["backend"], "Anthropic API (commercial)");
        assert_eq!(value["max_file_size_mb"], 25);
        assert_eq!(value["allowed_extensions"][0], ".pdf");
    }
}
