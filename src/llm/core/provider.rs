//! Provider trait for LLM implementations

use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

use super::{error::LlmError, types::{GenerateRequest, StreamEvent}};
use crate::llm::claude::{ClaudeClient, ClaudeEndpoint, ClaudeModel};

/// Boxed stream of provider events
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// Main interface that all LLM provider implementations must satisfy
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stream generate content from the LLM
    ///
    /// Sends the request and returns a stream of events representing the
    /// incremental response. Errors returned here mean the request never
    /// started; errors inside the stream mean it broke off midway.
    async fn stream_generate(&self, request: GenerateRequest) -> Result<EventStream, LlmError>;
}

/// Create an LLM provider for a Claude model behind the given endpoint
///
/// # Example
///
/// ```rust,no_run
/// use chat::llm::{create_provider, ClaudeEndpoint, ClaudeModel};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = create_provider(
///     ClaudeModel::Sonnet45,
///     ClaudeEndpoint::Vertex {
///         project_id: "my-project".to_string(),
///         location: "us-east5".to_string(),
///     },
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn create_provider(
    model: ClaudeModel,
    endpoint: ClaudeEndpoint,
) -> Result<Box<dyn LlmProvider>, LlmError> {
    let client = ClaudeClient::new(endpoint, model).await?;
    Ok(Box::new(client))
}
