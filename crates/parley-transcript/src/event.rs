//! Channel notifications, parsed at the boundary into a closed set of kinds.

use parley_types::{Role, VadState};
use serde_json::Value;

/// A notification from the real-time voice channel.
///
/// The channel delivers loosely-typed JSON. [`ChannelEvent::from_json`] maps
/// every payload to exactly one variant so the session's dispatch is total;
/// anything it does not recognise becomes [`ChannelEvent::Unknown`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A role started speaking.
    TurnStart {
        /// The speaking role, if the payload named a known one.
        role: Option<Role>,
        /// The turn being opened.
        turn_id: Option<String>,
    },

    /// A turn boundary: the named turn is complete.
    TurnEnd {
        /// The role whose turn ended, if given.
        role: Option<Role>,
        /// The turn being closed.
        turn_id: Option<String>,
    },

    /// A partial user transcript fragment.
    TranscriptDelta {
        /// The user turn this fragment belongs to.
        turn_id: Option<String>,
        /// Ordering key; `None` when absent or not coercible to an integer.
        counter: Option<u64>,
        /// The fragment text.
        content: String,
        /// Whether the platform flagged the fragment as interim.
        interim: bool,
    },

    /// The final transcript of a user turn, delivered whole.
    TranscriptFinal {
        /// The user turn being finalised.
        turn_id: Option<String>,
        /// The complete turn text.
        content: String,
    },

    /// A block of generated assistant text.
    ResponseText {
        /// The assistant turn the text belongs to.
        turn_id: Option<String>,
        /// The generated text.
        content: String,
    },

    /// Voice activity detector report.
    VoiceActivity(VadState),

    /// The microphone was muted or unmuted.
    MuteChanged {
        /// The new mute state.
        muted: bool,
    },

    /// A notification with an unrecognised or missing `type`.
    Unknown {
        /// The `type` field as received (empty when missing).
        kind: String,
        /// The full payload, kept for diagnostics.
        raw: Value,
    },
}

impl ChannelEvent {
    /// Parses a channel notification.
    ///
    /// Never fails: malformed fields degrade to `None`/empty values and
    /// unrecognised discriminants map to [`ChannelEvent::Unknown`].
    pub fn from_json(value: &Value) -> Self {
        let kind = value.get("type").and_then(Value::as_str).unwrap_or("");
        let turn_id = || value.get("turn_id").and_then(coerce_turn_id);
        let content = || {
            value
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string()
        };
        let role = || {
            value
                .get("role")
                .and_then(Value::as_str)
                .and_then(|r| r.parse().ok())
        };

        match kind {
            "turn.start" => Self::TurnStart {
                role: role(),
                turn_id: turn_id(),
            },
            "turn.end" => Self::TurnEnd {
                role: role(),
                turn_id: turn_id(),
            },
            "user.transcript.delta" | "user.transcript.interim_delta" => Self::TranscriptDelta {
                turn_id: turn_id(),
                counter: value.get("delta_counter").and_then(coerce_counter),
                content: content(),
                interim: kind == "user.transcript.interim_delta",
            },
            "user.transcript" => Self::TranscriptFinal {
                turn_id: turn_id(),
                content: content(),
            },
            "response.text" => Self::ResponseText {
                turn_id: turn_id(),
                content: content(),
            },
            "vad_events" => match value
                .get("event")
                .and_then(Value::as_str)
                .and_then(VadState::from_event)
            {
                Some(state) => Self::VoiceActivity(state),
                None => Self::unknown(kind, value),
            },
            "mute" => Self::MuteChanged { muted: true },
            "unmute" => Self::MuteChanged { muted: false },
            _ => Self::unknown(kind, value),
        }
    }

    fn unknown(kind: &str, value: &Value) -> Self {
        Self::Unknown {
            kind: kind.to_string(),
            raw: value.clone(),
        }
    }

    /// Returns the wire discriminant this event was parsed from.
    pub fn event_type(&self) -> &str {
        match self {
            Self::TurnStart { .. } => "turn.start",
            Self::TurnEnd { .. } => "turn.end",
            Self::TranscriptDelta { interim: false, .. } => "user.transcript.delta",
            Self::TranscriptDelta { interim: true, .. } => "user.transcript.interim_delta",
            Self::TranscriptFinal { .. } => "user.transcript",
            Self::ResponseText { .. } => "response.text",
            Self::VoiceActivity(_) => "vad_events",
            Self::MuteChanged { muted: true } => "mute",
            Self::MuteChanged { muted: false } => "unmute",
            Self::Unknown { kind, .. } => kind.as_str(),
        }
    }
}

/// Coerces a `turn_id` field (string or number) to a string.
///
/// Empty strings, `null`, and other JSON types yield `None`.
pub fn coerce_turn_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerces a `delta_counter` field to a non-negative integer.
///
/// Accepts integers, integral floats, and strings holding either. Anything
/// else (negative, fractional, blank, non-numeric) yields `None`.
pub fn coerce_counter(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

fn integral(f: f64) -> Option<u64> {
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}
