//! Browser session authorization against the voice-agent platform.

use crate::config::PlatformConfig;
use crate::error::AgentError;
use serde_json::Value;
use std::fmt;

/// Relays session-authorization requests to the platform.
#[derive(Clone)]
pub struct AuthorizeClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl fmt::Debug for AuthorizeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizeClient")
            .field("endpoint", &self.endpoint)
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl AuthorizeClient {
    pub fn new(config: &PlatformConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.authorize_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Forwards `request` to the authorize endpoint and returns its JSON.
    ///
    /// The request body must be a JSON object with a non-empty `agent_id`;
    /// it is otherwise passed through untouched.
    ///
    /// # Errors
    ///
    /// - [`AgentError::Config`] if no API key is configured.
    /// - [`AgentError::BadRequest`] if `agent_id` is missing.
    /// - [`AgentError::Upstream`] carrying the platform's status and body
    ///   (or reason phrase when the body is empty).
    /// - [`AgentError::Http`] / [`AgentError::InvalidResponse`] for
    ///   transport and decoding failures.
    pub async fn authorize(&self, request: &Value) -> Result<Value, AgentError> {
        if !self.is_configured() {
            return Err(AgentError::Config(
                "LAYERCODE_API_KEY is not set.".to_string(),
            ));
        }

        let has_agent_id = request
            .get("agent_id")
            .is_some_and(|id| !id.is_null() && id.as_str() != Some(""));
        if !has_agent_id {
            return Err(AgentError::BadRequest(
                "Missing agent_id in request body.".to_string(),
            ));
        }

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body
            };
            tracing::warn!(status = status.as_u16(), %message, "session authorization rejected");
            return Err(AgentError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
