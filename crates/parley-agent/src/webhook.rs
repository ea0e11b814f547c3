//! Wire types for the platform's agent webhook.

use serde::{Deserialize, Serialize};

/// Webhook event kinds sent by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookKind {
    /// The user finished a turn; `text` holds their transcript.
    #[serde(rename = "message")]
    Message,
    /// A new voice session began.
    #[serde(rename = "session.start")]
    SessionStart,
    /// The voice session ended.
    #[serde(rename = "session.end")]
    SessionEnd,
    /// Session metadata changed.
    #[serde(rename = "session.update")]
    SessionUpdate,
}

/// Body of an inbound webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookRequest {
    pub conversation_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub turn_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: WebhookKind,
}

/// One event of the streamed webhook response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseEvent {
    /// Text for the platform to speak.
    #[serde(rename = "response.tts")]
    Tts {
        content: String,
        turn_id: Option<String>,
    },
    /// The response for this turn is complete.
    #[serde(rename = "response.end")]
    End { turn_id: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_message_webhook() {
        let req: WebhookRequest = serde_json::from_value(json!({
            "conversation_id": "c1",
            "text": "hello",
            "turn_id": "t1",
            "type": "message"
        }))
        .unwrap();
        assert_eq!(req.kind, WebhookKind::Message);
        assert_eq!(req.turn_id.as_deref(), Some("t1"));
    }

    #[test]
    fn text_and_turn_id_are_optional() {
        let req: WebhookRequest = serde_json::from_value(json!({
            "conversation_id": "c1",
            "type": "session.end"
        }))
        .unwrap();
        assert_eq!(req.kind, WebhookKind::SessionEnd);
        assert!(req.text.is_empty());
        assert!(req.turn_id.is_none());
    }

    #[test]
    fn rejects_unknown_kind() {
        let result = serde_json::from_value::<WebhookRequest>(json!({
            "conversation_id": "c1",
            "type": "session.teleport"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn response_events_use_platform_tags() {
        let tts = serde_json::to_value(ResponseEvent::Tts {
            content: "Hi".to_string(),
            turn_id: Some("t1".to_string()),
        })
        .unwrap();
        assert_eq!(tts, json!({ "type": "response.tts", "content": "Hi", "turn_id": "t1" }));

        let end = serde_json::to_value(ResponseEvent::End { turn_id: None }).unwrap();
        assert_eq!(end, json!({ "type": "response.end", "turn_id": null }));
    }
}
