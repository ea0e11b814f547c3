//! Shared types for the Parley voice-agent client.
//!
//! This crate provides the display-side data model used across the
//! workspace: conversation roles, transcript chunks, and the
//! [`ConversationEntry`] rows that the turn reconciler maintains. Session
//! status enums (connection, turn indicator, voice activity) live in
//! [`session`].

use serde::{Deserialize, Serialize};

pub mod session;

pub use session::{ConnectionStatus, TurnIndicator, VadState};

/// The speaker a conversation entry is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human on the microphone.
    User,
    /// The voice agent.
    Assistant,
    /// Client-side status lines ("Connected", "Disconnected", ...).
    System,
    /// Opaque diagnostic payloads from the real-time channel.
    Data,
}

impl Role {
    /// Returns the canonical wire label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Data => "data",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            "data" => Ok(Self::Data),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown role string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError(pub String);

impl std::fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for ParseRoleError {}

/// One fragment of a turn's transcript, tagged with its delta counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptChunk {
    /// Ordering key assigned by the real-time channel.
    pub counter: u64,
    /// The fragment text.
    pub text: String,
}

/// A single row in the displayed transcript.
///
/// Rows with a `turn_id` are unique per `(role, turn_id)` and are updated in
/// place as more text arrives. Rows without one are never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    /// Who the row is attributed to.
    pub role: Role,
    /// The current text of the row.
    pub text: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Correlation key for merging deltas into this row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<String>,
    /// The ordered chunks the text was rebuilt from, if it came from deltas.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<TranscriptChunk>,
}

impl ConversationEntry {
    /// Creates an entry stamped with the current wall-clock time.
    pub fn new(role: Role, turn_id: Option<String>, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            turn_id,
            chunks: Vec::new(),
        }
    }

    /// Creates a `system` status entry with no turn id.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, None, text)
    }

    /// Attaches the chunks this entry's text was reconstructed from.
    pub fn with_chunks(mut self, chunks: Vec<TranscriptChunk>) -> Self {
        self.chunks = chunks;
        self
    }

    /// Returns `true` if this entry is the row for `(role, turn_id)`.
    pub fn is_turn(&self, role: Role, turn_id: &str) -> bool {
        self.role == role && self.turn_id.as_deref() == Some(turn_id)
    }
}
