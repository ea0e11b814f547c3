//! Parley server library logic.

pub mod api;
pub mod background;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use config::Config;
use parley_agent::{
    AgentService, AuthorizeClient, ChatClient, ConversationStore, PlatformConfig,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Webhook responder and conversation history.
    pub agent: AgentService,
    /// Relay for browser session authorization.
    pub authorize: AuthorizeClient,
    /// Webhook secret and signature tolerance.
    pub platform: PlatformConfig,
}

impl AppState {
    /// Builds the state from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let store = ConversationStore::from_config(&config.sessions);
        let chat = ChatClient::new(config.llm.clone());
        if !chat.is_configured() {
            tracing::warn!("no LLM API key configured; agent replies will be empty");
        }
        if config.platform.webhook_secret.is_empty() {
            tracing::warn!("no webhook secret configured; every agent webhook will be rejected");
        }

        Self {
            agent: AgentService::new(store, chat, config.agent.clone()),
            authorize: AuthorizeClient::new(&config.platform),
            platform: config.platform.clone(),
        }
    }
}

/// Maximum request body size (2 MiB). Protects against OOM from oversized payloads.
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/authorize", post(api::authorize_handler))
        .route("/api/agent", post(api::agent_webhook_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
