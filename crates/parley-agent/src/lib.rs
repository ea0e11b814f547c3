//! Agent backend for the Parley voice-agent client.
//!
//! The voice-agent platform handles audio, speech recognition, and speech
//! synthesis. This crate covers the two server-side duties it delegates:
//!
//! - answering agent webhooks: each user turn is sent to an
//!   OpenAI-compatible model and the streamed reply is relayed back as
//!   speech events ([`AgentService`]);
//! - authorizing browser voice sessions with the platform's API key
//!   ([`AuthorizeClient`]).
//!
//! Webhooks are authenticated with an HMAC signature ([`signature`]).
//! Conversation history lives in a bounded in-memory store with idle expiry
//! ([`ConversationStore`]).

pub mod authorize;
pub mod config;
pub mod error;
pub mod llm;
pub mod service;
pub mod signature;
pub mod store;
pub mod webhook;

pub use authorize::AuthorizeClient;
pub use config::{AgentConfig, LlmConfig, PlatformConfig, SessionConfig};
pub use error::{AgentError, SignatureError};
pub use llm::ChatClient;
pub use service::{AgentService, WebhookReply};
pub use store::{ChatMessage, ConversationStore};
pub use webhook::{ResponseEvent, WebhookKind, WebhookRequest};
