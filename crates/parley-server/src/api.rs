//! HTTP handlers for the agent webhook and session authorization.

use crate::AppState;
use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    Json,
};
use parley_agent::signature::{self, SIGNATURE_HEADER};
use parley_agent::{AgentError, WebhookReply, WebhookRequest};
use serde_json::Value;
use std::{convert::Infallible, sync::Arc};
use thiserror::Error;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("upstream error ({status}): {message}")]
    Upstream { status: StatusCode, message: String },
    #[error("bad gateway: {0}")]
    BadGateway(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Upstream { status, message } => (status, message),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Config(msg) => ApiError::InternalServerError(msg),
            AgentError::BadRequest(msg) => ApiError::BadRequest(msg),
            AgentError::Upstream { status, message } => ApiError::Upstream {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message,
            },
            AgentError::Http(e) => ApiError::BadGateway(e.to_string()),
            AgentError::InvalidResponse(e) => ApiError::BadGateway(e.to_string()),
        }
    }
}

/// Handler for `POST /api/authorize`.
///
/// Relays the browser's session request to the platform and returns the
/// platform's JSON untouched.
pub async fn authorize_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    if !state.authorize.is_configured() {
        tracing::error!("session authorization requested but no platform API key is configured");
        return Err(AgentError::Config("LAYERCODE_API_KEY is not set.".to_string()).into());
    }

    let request: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))?;

    let session = state.authorize.authorize(&request).await.map_err(|e| {
        tracing::warn!(error = %e, "session authorization failed");
        ApiError::from(e)
    })?;

    Ok(Json(session))
}

/// Plain-text body of a `401` for a webhook that fails signature checks.
pub const INVALID_SIGNATURE: &str = "Invalid layercode-signature";

/// Handler for `POST /api/agent`.
///
/// Verifies the webhook signature over the raw body, then either streams
/// speech events back as server-sent events or acknowledges with `200 OK`.
/// A bad signature gets a plain-text `401`.
pub async fn agent_webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if let Err(e) = signature::verify(
        header,
        &body,
        &state.platform.webhook_secret,
        state.platform.signature_tolerance_seconds,
        chrono::Utc::now().timestamp(),
    ) {
        tracing::warn!(error = %e, "rejected agent webhook");
        return Ok((StatusCode::UNAUTHORIZED, INVALID_SIGNATURE).into_response());
    }

    let request: WebhookRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid webhook body: {}", e)))?;

    match state.agent.handle(request) {
        WebhookReply::Stream(rx) => {
            let events = ReceiverStream::new(rx).filter_map(|event| {
                match serde_json::to_string(&event) {
                    Ok(data) => Some(Ok::<_, Infallible>(Event::default().data(data))),
                    Err(e) => {
                        tracing::error!("failed to serialize response event: {}", e);
                        None
                    }
                }
            });
            Ok(Sse::new(events)
                .keep_alive(KeepAlive::default())
                .into_response())
        }
        WebhookReply::Ack => Ok((StatusCode::OK, "OK").into_response()),
    }
}
