//! Application Default Credentials (ADC) wrapper for Vertex AI

use gcp_auth::AuthenticationManager as GcpAuthManager;

use crate::llm::core::error::LlmError;

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Manages GCP access tokens for the Vertex AI Claude endpoint
///
/// Credentials are discovered with the standard ADC flow:
/// - `GOOGLE_APPLICATION_CREDENTIALS` environment variable
/// - User credentials from `gcloud auth application-default login`
/// - Metadata server (Compute Engine, Cloud Run, GKE)
///
/// Tokens are cached by `gcp_auth` and refreshed when they expire.
pub struct AuthenticationManager {
    inner: GcpAuthManager,
}

impl AuthenticationManager {
    /// # Errors
    /// Returns an error if no valid credentials can be found.
    pub async fn new() -> Result<Self, LlmError> {
        let inner = GcpAuthManager::new().await.map_err(|e| {
            LlmError::AuthenticationError(format!("Failed to initialize ADC: {}", e))
        })?;

        Ok(Self { inner })
    }

    /// Get a bearer token for the cloud platform scope
    pub async fn get_token(&self) -> Result<String, LlmError> {
        let token = self
            .inner
            .get_token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| LlmError::AuthenticationError(format!("Failed to get token: {}", e)))?;

        Ok(token.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Only run with valid credentials
    async fn test_get_token() {
        let auth = AuthenticationManager::new()
            .await
            .expect("Failed to initialize AuthenticationManager");

        let token = auth
            .get_token()
            .await
            .expect("Failed to retrieve access token");

        assert!(token.len() > 20, "Token seems too short: {}", token.len());
    }
}
