//! Configuration sections consumed by the agent backend.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_AUTHORIZE_URL: &str =
    "https://api.layercode.com/v1/agents/web/authorize_session";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

fn default_authorize_url() -> String {
    DEFAULT_AUTHORIZE_URL.to_string()
}

fn default_signature_tolerance_seconds() -> u64 {
    300
}

fn default_llm_base_url() -> String {
    DEFAULT_LLM_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_request_timeout_seconds() -> u64 {
    60
}

fn default_stream_idle_timeout_seconds() -> u64 {
    30
}

fn default_prompt() -> String {
    "You are a helpful conversation assistant. Keep responses short and conversational; \
     they will be spoken aloud."
        .to_string()
}

fn default_welcome_message() -> String {
    "Hi! How can I help you today?".to_string()
}

fn default_session_ttl_seconds() -> u64 {
    30 * 60
}

fn default_max_conversations() -> usize {
    1000
}

fn default_max_messages() -> usize {
    200
}

fn default_prune_interval_seconds() -> u64 {
    60
}

/// Credentials and endpoints of the voice-agent platform.
#[derive(Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// API key used to authorize browser sessions.
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Shared secret for verifying inbound webhook signatures.
    #[serde(default, skip_serializing)]
    pub webhook_secret: String,
    /// Session authorization endpoint.
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    /// Maximum age of a signed webhook in seconds. Default: 300.
    #[serde(default = "default_signature_tolerance_seconds")]
    pub signature_tolerance_seconds: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            webhook_secret: String::new(),
            authorize_url: default_authorize_url(),
            signature_tolerance_seconds: default_signature_tolerance_seconds(),
        }
    }
}

impl fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("webhook_secret", &redacted(&self.webhook_secret))
            .field("authorize_url", &self.authorize_url)
            .field(
                "signature_tolerance_seconds",
                &self.signature_tolerance_seconds,
            )
            .finish()
    }
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Base URL; `/chat/completions` is appended.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Timeout for the initial response headers in seconds. Default: 60.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// Longest gap between streamed chunks before the reply is cut short.
    /// Default: 30.
    #[serde(default = "default_stream_idle_timeout_seconds")]
    pub stream_idle_timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_llm_base_url(),
            model: default_model(),
            request_timeout_seconds: default_request_timeout_seconds(),
            stream_idle_timeout_seconds: default_stream_idle_timeout_seconds(),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field(
                "stream_idle_timeout_seconds",
                &self.stream_idle_timeout_seconds,
            )
            .finish()
    }
}

/// What the agent says.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// System prompt sent ahead of the conversation history.
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Spoken when a session starts.
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            welcome_message: default_welcome_message(),
        }
    }
}

/// Bounds on the in-memory conversation store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle time after which a conversation is dropped. Default: 1800.
    #[serde(default = "default_session_ttl_seconds")]
    pub ttl_seconds: u64,
    /// Maximum live conversations; the least recently used is evicted.
    #[serde(default = "default_max_conversations")]
    pub max_conversations: usize,
    /// Maximum messages kept per conversation; the oldest are dropped.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    /// Seconds between background prune passes. `0` disables the task.
    #[serde(default = "default_prune_interval_seconds")]
    pub prune_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_session_ttl_seconds(),
            max_conversations: default_max_conversations(),
            max_messages: default_max_messages(),
            prune_interval_seconds: default_prune_interval_seconds(),
        }
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        "[UNSET]"
    } else {
        "[REDACTED]"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_secrets() {
        let platform = PlatformConfig {
            api_key: "pk_live_123".to_string(),
            webhook_secret: "whsec_456".to_string(),
            ..Default::default()
        };
        let llm = LlmConfig {
            api_key: "sk-789".to_string(),
            ..Default::default()
        };
        let out = format!("{:?} {:?}", platform, llm);
        assert!(!out.contains("pk_live_123"));
        assert!(!out.contains("whsec_456"));
        assert!(!out.contains("sk-789"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn unset_secrets_are_marked() {
        let out = format!("{:?}", PlatformConfig::default());
        assert!(out.contains("[UNSET]"));
    }
}
