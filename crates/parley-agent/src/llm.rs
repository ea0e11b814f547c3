//! Streaming client for OpenAI-compatible chat completion APIs.

use crate::config::LlmConfig;
use crate::error::AgentError;
use crate::store::ChatMessage;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Capacity of the per-request delta channel.
const DELTA_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// One parsed line of a server-sent event stream.
#[derive(Debug, PartialEq, Eq)]
pub enum StreamLine {
    /// A non-empty text delta.
    Delta(String),
    /// The `[DONE]` terminator.
    Done,
    /// Blank lines, comments, role-only chunks, and unparseable data.
    Skip,
}

/// Parses a single SSE line from a chat completion stream.
pub fn parse_stream_line(line: &str) -> StreamLine {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return StreamLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return StreamLine::Done;
    }
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map_or(StreamLine::Skip, StreamLine::Delta),
        Err(e) => {
            tracing::debug!(error = %e, data, "failed to parse completion chunk");
            StreamLine::Skip
        }
    }
}

/// Chat completion client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl ChatClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Starts a streamed completion for `history` under `system_prompt`.
    ///
    /// Returns once the upstream has accepted the request; text deltas then
    /// arrive on the returned channel, which closes when the stream ends.
    /// A dropped receiver stops the read loop, and so does a gap of more than
    /// `stream_idle_timeout_seconds` between chunks.
    ///
    /// # Errors
    ///
    /// Fails if no API key is configured, the request cannot be sent, or the
    /// upstream answers with a non-success status.
    pub async fn stream_reply(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
    ) -> Result<mpsc::Receiver<String>, AgentError> {
        if !self.is_configured() {
            return Err(AgentError::Config("LLM API key is not set".to_string()));
        }

        let mut messages = Vec::with_capacity(history.len() + 1);
        if !system_prompt.is_empty() {
            messages.push(WireMessage {
                role: "system",
                content: system_prompt,
            });
        }
        messages.extend(history.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));

        let body = CompletionRequest {
            model: &self.config.model,
            stream: true,
            messages,
        };

        let send = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send();
        let response = tokio::time::timeout(
            Duration::from_secs(self.config.request_timeout_seconds),
            send,
        )
        .await
        .map_err(|_| AgentError::Upstream {
            status: 504,
            message: format!(
                "no response within {} seconds",
                self.config.request_timeout_seconds
            ),
        })??;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AgentError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let (tx, rx) = mpsc::channel(DELTA_CHANNEL_CAPACITY);
        let model = self.config.model.clone();
        let idle_timeout = Duration::from_secs(self.config.stream_idle_timeout_seconds);

        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            loop {
                let next = match tokio::time::timeout(idle_timeout, stream.next()).await {
                    Ok(Some(next)) => next,
                    Ok(None) => break,
                    Err(_) => {
                        tracing::warn!(
                            model = %model,
                            idle_seconds = idle_timeout.as_secs(),
                            "completion stream stalled, ending reply"
                        );
                        return;
                    }
                };
                let bytes = match next {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(error = %e, model = %model, "completion stream interrupted");
                        return;
                    }
                };
                buffer.extend_from_slice(&bytes);

                // Split on raw newlines so multi-byte characters spanning
                // chunk boundaries are decoded whole.
                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    match parse_stream_line(&String::from_utf8_lossy(&line)) {
                        StreamLine::Delta(text) => {
                            if tx.send(text).await.is_err() {
                                return;
                            }
                        }
                        StreamLine::Done => {
                            tracing::debug!(model = %model, "completion stream finished");
                            return;
                        }
                        StreamLine::Skip => {}
                    }
                }
            }

            // Flush a final unterminated line.
            if let StreamLine::Delta(text) = parse_stream_line(&String::from_utf8_lossy(&buffer)) {
                let _ = tx.send(text).await;
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(parse_stream_line(line), StreamLine::Delta("Hel".to_string()));
    }

    #[test]
    fn parses_done_marker() {
        assert_eq!(parse_stream_line("data: [DONE]"), StreamLine::Done);
        assert_eq!(parse_stream_line("data:[DONE]\r"), StreamLine::Done);
    }

    #[test]
    fn skips_noise() {
        for line in [
            "",
            ": keep-alive",
            "event: ping",
            r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"data: {"choices":[{"delta":{"content":""}}]}"#,
            r#"data: {"choices":[]}"#,
            "data: {not json",
        ] {
            assert_eq!(parse_stream_line(line), StreamLine::Skip, "line: {:?}", line);
        }
    }

    #[tokio::test]
    async fn refuses_without_api_key() {
        let client = ChatClient::new(LlmConfig::default());
        let err = client.stream_reply("prompt", &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }
}
