//! Application configuration
//!
//! Settings are read from command-line flags with environment-variable
//! fallbacks. `main` loads a `.env` file first, so either source works.

use clap::{Parser, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::llm::{ClaudeEndpoint, ClaudeModel, LlmError};
use crate::llm::claude::DEFAULT_ANTHROPIC_BASE_URL;

pub const APP_NAME: &str = "CHAT";
pub const APP_FULL_NAME: &str = "Cloud-Hosted AI Terminal";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_JWT_SECRET: &str = "change-this-in-production-use-a-real-secret";
pub const DEFAULT_TITLE: &str = "New Chat";

pub const MAX_FILE_SIZE_MB: usize = 25;
pub const MAX_FILE_SIZE_BYTES: usize = MAX_FILE_SIZE_MB * 1024 * 1024;

/// Upper bound on one send request: a handful of maximum-size files plus the text
pub const MAX_REQUEST_BYTES: u64 = (4 * MAX_FILE_SIZE_BYTES + 1024 * 1024) as u64;

/// Accepted upload extensions and their MIME types
pub const ALLOWED_EXTENSIONS: &[(&str, &str)] = &[
    (".pdf", "application/pdf"),
    (".doc", "application/msword"),
    (
        ".docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    (".txt", "text/plain"),
    (".md", "text/markdown"),
    (".csv", "text/csv"),
    (".png", "image/png"),
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".gif", "image/gif"),
    (".webp", "image/webp"),
];

/// USD per million tokens
pub const COST_PER_1M_INPUT_TOKENS: f64 = 3.00;
pub const COST_PER_1M_OUTPUT_TOKENS: f64 = 15.00;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.
You can help with a wide variety of tasks including:
- Summarization of documents and text
- Technical writing and editing
- Code review, debugging, and development
- Research assistance and analysis
- General questions and problem-solving

Be professional, accurate, and thorough in your responses. If you're unsure about something, say so.
When working with code, provide clear explanations and follow best practices.";

/// Backend preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    /// Anthropic Messages API
    Commercial,
    /// Claude on Google Cloud Vertex AI
    Vertex,
}

impl Environment {
    pub fn name(&self) -> &'static str {
        match self {
            Environment::Commercial => "commercial",
            Environment::Vertex => "vertex",
        }
    }
}

/// Per-million-token pricing used for cost display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            input_per_million: COST_PER_1M_INPUT_TOKENS,
            output_per_million: COST_PER_1M_OUTPUT_TOKENS,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "chat", version, about = "CHAT - Cloud-Hosted AI Terminal")]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "CHAT_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    #[arg(long, env = "CHAT_PORT", default_value_t = 3030)]
    pub port: u16,

    /// SQLite database file
    #[arg(long, env = "CHAT_DB_PATH", default_value = "chat.db")]
    pub db_path: PathBuf,

    /// Secret used to sign session tokens
    #[arg(long, env = "CHAT_JWT_SECRET", default_value = DEFAULT_JWT_SECRET, hide_default_value = true)]
    pub jwt_secret: String,

    #[arg(long, env = "CHAT_JWT_EXPIRATION_HOURS", default_value_t = 24)]
    pub jwt_expiration_hours: i64,

    /// Backend preset
    #[arg(long, env = "CHAT_ENVIRONMENT", value_enum, default_value = "commercial")]
    pub environment: Environment,

    /// Model key: sonnet-4.5 or haiku-4.5
    #[arg(long, env = "CHAT_MODEL", default_value = "sonnet-4.5")]
    pub model: ClaudeModel,

    #[arg(long, env = "CHAT_MAX_TOKENS", default_value_t = 4096)]
    pub max_tokens: u32,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = DEFAULT_ANTHROPIC_BASE_URL)]
    pub anthropic_base_url: String,

    #[arg(long, env = "GCP_PROJECT_ID")]
    pub gcp_project_id: Option<String>,

    #[arg(long, env = "GCP_REGION", default_value = "us-east5")]
    pub gcp_region: String,
}

/// Resolved application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub environment: Environment,
    pub model: ClaudeModel,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub pricing: Pricing,
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub gcp_project_id: Option<String>,
    pub gcp_region: String,
}

impl From<Cli> for AppConfig {
    fn from(cli: Cli) -> Self {
        Self {
            bind_addr: SocketAddr::new(cli.host, cli.port),
            db_path: cli.db_path,
            jwt_secret: cli.jwt_secret,
            jwt_expiration_hours: cli.jwt_expiration_hours,
            environment: cli.environment,
            model: cli.model,
            max_tokens: cli.max_tokens,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            pricing: Pricing::default(),
            anthropic_api_key: cli.anthropic_api_key,
            anthropic_base_url: cli.anthropic_base_url,
            gcp_project_id: cli.gcp_project_id,
            gcp_region: cli.gcp_region,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
            db_path: PathBuf::from("chat.db"),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_expiration_hours: 24,
            environment: Environment::Commercial,
            model: ClaudeModel::Sonnet45,
            max_tokens: 4096,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            pricing: Pricing::default(),
            anthropic_api_key: None,
            anthropic_base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            gcp_project_id: None,
            gcp_region: "us-east5".to_string(),
        }
    }
}

impl AppConfig {
    pub fn uses_default_jwt_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    /// Backend name shown in the sidebar
    pub fn backend_display_name(&self) -> String {
        match self.environment {
            Environment::Commercial => "Anthropic API (commercial)".to_string(),
            Environment::Vertex => format!("Google Vertex AI ({})", self.gcp_region),
        }
    }

    /// Transport for the selected backend
    ///
    /// # Errors
    /// Returns a configuration error when the preset's credential setting
    /// is missing.
    pub fn endpoint(&self) -> Result<ClaudeEndpoint, LlmError> {
        match self.environment {
            Environment::Commercial => {
                let api_key = self.anthropic_api_key.clone().ok_or_else(|| {
                    LlmError::ConfigurationError("ANTHROPIC_API_KEY is not set".to_string())
                })?;
                Ok(ClaudeEndpoint::Anthropic {
                    api_key,
                    base_url: self.anthropic_base_url.clone(),
                })
            }
            Environment::Vertex => {
                let project_id = self.gcp_project_id.clone().ok_or_else(|| {
                    LlmError::ConfigurationError("GCP_PROJECT_ID is not set".to_string())
                })?;
                Ok(ClaudeEndpoint::Vertex {
                    project_id,
                    location: self.gcp_region.clone(),
                })
            }
        }
    }
}

/// MIME type for an allowed extension (including the leading dot)
pub fn allowed_mime_type(extension: &str) -> Option<&'static str> {
    ALLOWED_EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["chat"]).unwrap();
        let config = AppConfig::from(cli);

        assert_eq!(config.bind_addr.port(), 3030);
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.jwt_expiration_hours, 24);
        assert_eq!(config.model, ClaudeModel::Sonnet45);
    }

    #[test]
    fn test_cli_flags_override() {
        let cli = Cli::try_parse_from([
            "chat",
            "--port",
            "8080",
            "--environment",
            "vertex",
            "--gcp-project-id",
            "acme",
            "--model",
            "haiku-4.5",
        ])
        .unwrap();
        let config = AppConfig::from(cli);

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.environment, Environment::Vertex);
        assert_eq!(config.model, ClaudeModel::Haiku45);
        match config.endpoint().unwrap() {
            ClaudeEndpoint::Vertex { project_id, location } => {
                assert_eq!(project_id, "acme");
                assert_eq!(location, "us-east5");
            }
            _ => panic!("Expected Vertex endpoint"),
        }
    }

    #[test]
    fn test_missing_api_key_is_a_configuration_error() {
        let config = AppConfig::default();
        assert!(matches!(
            config.endpoint(),
            Err(LlmError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_allowed_mime_type() {
        assert_eq!(allowed_mime_type(".jpg"), Some("image/jpeg"));
        assert_eq!(allowed_mime_type(".md"), Some("text/markdown"));
        assert_eq!(allowed_mime_type(".exe"), None);
    }

    #[test]
    fn test_default_secret_detected() {
        assert!(AppConfig::default().uses_default_jwt_secret());
    }
}
