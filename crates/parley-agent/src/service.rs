//! Webhook handling: conversation history bookkeeping and streamed replies.

use crate::config::AgentConfig;
use crate::llm::ChatClient;
use crate::store::{ChatMessage, ConversationStore};
use crate::webhook::{ResponseEvent, WebhookKind, WebhookRequest};
use tokio::sync::mpsc;

/// Capacity of the per-webhook response event channel.
const RESPONSE_CHANNEL_CAPACITY: usize = 64;

/// What the webhook endpoint should send back.
#[derive(Debug)]
pub enum WebhookReply {
    /// Stream these events to the platform, in order, until the channel
    /// closes. The last event is always [`ResponseEvent::End`].
    Stream(mpsc::Receiver<ResponseEvent>),
    /// Acknowledge with a plain `200 OK`.
    Ack,
}

/// Answers platform webhooks: records history, calls the model, and
/// produces the speech events for each turn.
#[derive(Debug, Clone)]
pub struct AgentService {
    store: ConversationStore,
    chat: ChatClient,
    agent: AgentConfig,
}

impl AgentService {
    pub fn new(store: ConversationStore, chat: ChatClient, agent: AgentConfig) -> Self {
        Self { store, chat, agent }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Handles a verified webhook.
    ///
    /// Must be called from within a tokio runtime: `message` events spawn a
    /// task that drives the model stream.
    pub fn handle(&self, request: WebhookRequest) -> WebhookReply {
        let WebhookRequest {
            conversation_id,
            text,
            turn_id,
            kind,
        } = request;

        tracing::info!(
            conversation_id = %conversation_id,
            turn_id = ?turn_id,
            kind = ?kind,
            "webhook received"
        );

        match kind {
            WebhookKind::SessionStart => {
                self.record_user(&conversation_id, turn_id.as_deref(), &text);
                let welcome = self.agent.welcome_message.clone();
                self.store
                    .push(&conversation_id, ChatMessage::assistant(welcome.clone()));

                let (tx, rx) = mpsc::channel(2);
                // Capacity covers both events; the receiver is still held here.
                let _ = tx.try_send(ResponseEvent::Tts {
                    content: welcome,
                    turn_id: turn_id.clone(),
                });
                let _ = tx.try_send(ResponseEvent::End { turn_id });
                WebhookReply::Stream(rx)
            }
            WebhookKind::Message => {
                self.record_user(&conversation_id, turn_id.as_deref(), &text);
                WebhookReply::Stream(self.spawn_reply(conversation_id, turn_id))
            }
            WebhookKind::SessionEnd => {
                if self.store.close(&conversation_id) {
                    tracing::debug!(conversation_id = %conversation_id, "conversation closed");
                }
                WebhookReply::Ack
            }
            WebhookKind::SessionUpdate => WebhookReply::Ack,
        }
    }

    fn record_user(&self, conversation_id: &str, turn_id: Option<&str>, text: &str) {
        if text.is_empty() {
            return;
        }
        let id = turn_id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.store.push(conversation_id, ChatMessage::user(id, text));
    }

    fn spawn_reply(
        &self,
        conversation_id: String,
        turn_id: Option<String>,
    ) -> mpsc::Receiver<ResponseEvent> {
        let (tx, rx) = mpsc::channel(RESPONSE_CHANNEL_CAPACITY);
        let history = self.store.history(&conversation_id);
        let store = self.store.clone();
        let chat = self.chat.clone();
        let prompt = self.agent.prompt.clone();

        tokio::spawn(async move {
            let mut reply = String::new();

            match chat.stream_reply(&prompt, &history).await {
                Ok(mut deltas) => {
                    while let Some(delta) = deltas.recv().await {
                        reply.push_str(&delta);
                        let event = ResponseEvent::Tts {
                            content: delta,
                            turn_id: turn_id.clone(),
                        };
                        if tx.send(event).await.is_err() {
                            tracing::debug!(
                                conversation_id = %conversation_id,
                                "webhook response closed before completion"
                            );
                            break;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(
                        conversation_id = %conversation_id,
                        model = chat.model(),
                        error = %e,
                        "completion request failed"
                    );
                }
            }

            if !reply.is_empty() {
                store.push(&conversation_id, ChatMessage::assistant(reply));
            }
            let _ = tx.send(ResponseEvent::End { turn_id }).await;
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use parley_types::Role;
    use std::time::Duration;

    fn service() -> AgentService {
        AgentService::new(
            ConversationStore::new(Duration::from_secs(60), 10, 10),
            ChatClient::new(LlmConfig::default()),
            AgentConfig {
                prompt: "be brief".to_string(),
                welcome_message: "Welcome!".to_string(),
            },
        )
    }

    fn request(kind: WebhookKind, text: &str) -> WebhookRequest {
        WebhookRequest {
            conversation_id: "c1".to_string(),
            text: text.to_string(),
            turn_id: Some("t1".to_string()),
            kind,
        }
    }

    async fn drain(reply: WebhookReply) -> Vec<ResponseEvent> {
        let WebhookReply::Stream(mut rx) = reply else {
            panic!("expected a streamed reply");
        };
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn session_start_speaks_welcome_and_records_it() {
        let service = service();
        let events = drain(service.handle(request(WebhookKind::SessionStart, ""))).await;

        assert_eq!(
            events,
            vec![
                ResponseEvent::Tts {
                    content: "Welcome!".to_string(),
                    turn_id: Some("t1".to_string()),
                },
                ResponseEvent::End {
                    turn_id: Some("t1".to_string())
                },
            ]
        );
        let history = service.store().history("c1");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::Assistant);
    }

    #[tokio::test]
    async fn message_without_model_still_ends_stream() {
        let service = service();
        let events = drain(service.handle(request(WebhookKind::Message, "hello"))).await;

        assert_eq!(
            events,
            vec![ResponseEvent::End {
                turn_id: Some("t1".to_string())
            }]
        );
        let history = service.store().history("c1");
        assert_eq!(history, vec![ChatMessage::user("t1", "hello")]);
    }

    #[tokio::test]
    async fn session_end_closes_conversation() {
        let service = service();
        drain(service.handle(request(WebhookKind::Message, "hello"))).await;
        assert_eq!(service.store().len(), 1);

        assert!(matches!(
            service.handle(request(WebhookKind::SessionEnd, "")),
            WebhookReply::Ack
        ));
        assert!(service.store().is_empty());
    }

    #[tokio::test]
    async fn session_update_is_acknowledged_without_recording() {
        let service = service();
        assert!(matches!(
            service.handle(request(WebhookKind::SessionUpdate, "ignored")),
            WebhookReply::Ack
        ));
        assert!(service.store().is_empty());
    }
}
