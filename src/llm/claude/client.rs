//! Claude client implementation

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use std::str::FromStr;
use std::time::Duration;

use crate::llm::auth::adc::AuthenticationManager;
use crate::llm::core::{
    error::LlmError,
    provider::{EventStream, LlmProvider},
    types::{GenerateRequest, StreamEvent, UsageMetadata},
};

use super::mapper::{from_claude_event, to_claude_request};
use super::sse::parse_sse_stream;

const ANTHROPIC_API_VERSION: &str = "2023-06-01";
const VERTEX_API_VERSION: &str = "vertex-2023-10-16";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Claude models offered in the model selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaudeModel {
    /// Claude Sonnet 4.5 (released 2025-09-29)
    Sonnet45,
    /// Claude Haiku 4.5 (released 2025-10-01)
    Haiku45,
}

impl ClaudeModel {
    /// Model identifier on Vertex AI
    pub fn vertex_id(&self) -> &'static str {
        match self {
            ClaudeModel::Sonnet45 => "claude-sonnet-4-5@20250929",
            ClaudeModel::Haiku45 => "claude-haiku-4-5@20251001",
        }
    }

    /// Model identifier on the Anthropic API
    pub fn api_id(&self) -> &'static str {
        match self {
            ClaudeModel::Sonnet45 => "claude-sonnet-4-5-20250929",
            ClaudeModel::Haiku45 => "claude-haiku-4-5-20251001",
        }
    }

    /// Short key used in configuration and the UI
    pub fn key(&self) -> &'static str {
        match self {
            ClaudeModel::Sonnet45 => "sonnet-4.5",
            ClaudeModel::Haiku45 => "haiku-4.5",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ClaudeModel::Sonnet45 => "Claude Sonnet 4.5",
            ClaudeModel::Haiku45 => "Claude Haiku 4.5",
        }
    }
}

impl FromStr for ClaudeModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sonnet-4.5" | "sonnet" => Ok(ClaudeModel::Sonnet45),
            "haiku-4.5" | "haiku" => Ok(ClaudeModel::Haiku45),
            other => Err(format!(
                "unknown model '{}', expected 'sonnet-4.5' or 'haiku-4.5'",
                other
            )),
        }
    }
}

/// Where the Messages API is reached
#[derive(Debug, Clone)]
pub enum ClaudeEndpoint {
    /// Anthropic API, authenticated with an API key
    Anthropic { api_key: String, base_url: String },
    /// Vertex AI, authenticated with Application Default Credentials
    Vertex { project_id: String, location: String },
}

impl ClaudeEndpoint {
    /// Streaming URL for the given model
    pub fn url(&self, model: ClaudeModel) -> String {
        match self {
            ClaudeEndpoint::Anthropic { base_url, .. } => {
                format!("{}/v1/messages", base_url.trim_end_matches('/'))
            }
            ClaudeEndpoint::Vertex {
                project_id,
                location,
            } => format!(
                "https://{}-aiplatform.googleapis.com/v1/projects/{}/locations/{}/publishers/anthropic/models/{}:streamRawPredict",
                location,
                project_id,
                location,
                model.vertex_id()
            ),
        }
    }
}

/// Client for streaming Claude responses
pub struct ClaudeClient {
    http_client: Client,
    endpoint: ClaudeEndpoint,
    /// Present for the Vertex endpoint only
    auth_manager: Option<AuthenticationManager>,
    model: ClaudeModel,
}

impl ClaudeClient {
    /// Create a new Claude client
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or, for Vertex AI, if no
    /// Application Default Credentials can be found.
    pub async fn new(endpoint: ClaudeEndpoint, model: ClaudeModel) -> Result<Self, LlmError> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| LlmError::HttpError {
                status: 0,
                body: format!("Failed to create HTTP client: {}", e),
            })?;

        let auth_manager = match &endpoint {
            ClaudeEndpoint::Anthropic { api_key, .. } => {
                if api_key.trim().is_empty() {
                    return Err(LlmError::ConfigurationError(
                        "ANTHROPIC_API_KEY is not set".to_string(),
                    ));
                }
                None
            }
            ClaudeEndpoint::Vertex { project_id, .. } => {
                if project_id.trim().is_empty() {
                    return Err(LlmError::ConfigurationError(
                        "GCP_PROJECT_ID is not set".to_string(),
                    ));
                }
                Some(AuthenticationManager::new().await?)
            }
        };

        Ok(Self {
            http_client,
            endpoint,
            auth_manager,
            model,
        })
    }

    pub fn model(&self) -> ClaudeModel {
        self.model
    }

    async fn make_streaming_request(&self, request: GenerateRequest) -> Result<EventStream, LlmError> {
        let mut claude_request = to_claude_request(request);
        let url = self.endpoint.url(self.model);

        let builder = match &self.endpoint {
            ClaudeEndpoint::Anthropic { api_key, .. } => {
                claude_request.model = Some(self.model.api_id().to_string());
                self.http_client
                    .post(&url)
                    .header("x-api-key", api_key)
                    .header("anthropic-version", ANTHROPIC_API_VERSION)
            }
            ClaudeEndpoint::Vertex { .. } => {
                claude_request.anthropic_version = Some(VERTEX_API_VERSION.to_string());
                let token = match &self.auth_manager {
                    Some(auth) => auth.get_token().await?,
                    None => {
                        return Err(LlmError::AuthenticationError(
                            "Vertex AI client has no credentials".to_string(),
                        ))
                    }
                };
                self.http_client
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", token))
            }
        };

        tracing::debug!(model = self.model.key(), %url, "Sending streaming request");

        let response = builder
            .header("Content-Type", "application/json")
            .json(&claude_request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(LlmError::RateLimitExceeded { retry_after });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        let sse_stream = parse_sse_stream(Box::pin(response.bytes_stream()));

        let mut accumulated_usage = UsageMetadata::default();
        let event_stream = sse_stream.flat_map(move |result| {
            let events: Vec<Result<StreamEvent, LlmError>> = match result {
                Ok(claude_event) => from_claude_event(claude_event, &mut accumulated_usage)
                    .into_iter()
                    .map(Ok)
                    .collect(),
                Err(e) => vec![Err(e)],
            };
            futures::stream::iter(events)
        });

        Ok(Box::pin(event_stream))
    }
}

#[async_trait]
impl LlmProvider for ClaudeClient {
    async fn stream_generate(&self, request: GenerateRequest) -> Result<EventStream, LlmError> {
        self.make_streaming_request(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::core::config::GenerationConfig;
    use crate::llm::core::types::{FinishReason, Message};

    #[test]
    fn test_claude_model_ids() {
        assert_eq!(ClaudeModel::Sonnet45.vertex_id(), "claude-sonnet-4-5@20250929");
        assert_eq!(ClaudeModel::Haiku45.vertex_id(), "claude-haiku-4-5@20251001");
        assert_eq!(ClaudeModel::Sonnet45.api_id(), "claude-sonnet-4-5-20250929");
        assert_eq!(ClaudeModel::Haiku45.display_name(), "Claude Haiku 4.5");
    }

    #[test]
    fn test_claude_model_from_str() {
        assert_eq!("sonnet-4.5".parse::<ClaudeModel>(), Ok(ClaudeModel::Sonnet45));
        assert_eq!("Haiku-4.5".parse::<ClaudeModel>(), Ok(ClaudeModel::Haiku45));
        assert!("opus".parse::<ClaudeModel>().is_err());
    }

    #[test]
    fn test_vertex_endpoint_url_format() {
        let endpoint = ClaudeEndpoint::Vertex {
            project_id: "my-project".to_string(),
            location: "us-east5".to_string(),
        };
        let url = endpoint.url(ClaudeModel::Sonnet45);

        assert_eq!(
            url,
            "https://us-east5-aiplatform.googleapis.com/v1/projects/my-project/locations/us-east5/publishers/anthropic/models/claude-sonnet-4-5@20250929:streamRawPredict"
        );
    }

    #[test]
    fn test_anthropic_endpoint_url_format() {
        let endpoint = ClaudeEndpoint::Anthropic {
            api_key: "sk-test".to_string(),
            base_url: "http://localhost:9999/".to_string(),
        };
        assert_eq!(
            endpoint.url(ClaudeModel::Haiku45),
            "http://localhost:9999/v1/messages"
        );
    }

    #[tokio::test]
    async fn test_empty_api_key_is_rejected() {
        let endpoint = ClaudeEndpoint::Anthropic {
            api_key: "  ".to_string(),
            base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
        };
        let result = ClaudeClient::new(endpoint, ClaudeModel::Sonnet45).await;
        assert!(matches!(result, Err(LlmError::ConfigurationError(_))));
    }

    #[tokio::test]
    #[ignore] // Requires ANTHROPIC_API_KEY
    async fn test_stream_generate_against_anthropic_api() {
        let api_key = std::env::var("ANTHROPIC_API_KEY").expect("ANTHROPIC_API_KEY not set");
        let client = ClaudeClient::new(
            ClaudeEndpoint::Anthropic {
                api_key,
                base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            },
            ClaudeModel::Haiku45,
        )
        .await
        .unwrap();

        let request = GenerateRequest {
            messages: vec![Message::user("Reply with the single word: pong")],
            config: GenerationConfig::new(32),
            system: None,
        };

        let mut stream = client.stream_generate(request).await.unwrap();
        let mut finished = false;
        while let Some(event) = stream.next().await {
            if let StreamEvent::MessageEnd { finish_reason, usage } = event.unwrap() {
                assert_eq!(finish_reason, FinishReason::EndTurn);
                assert!(usage.input_tokens > 0);
                finished = true;
            }
        }
        assert!(finished);
    }
}
