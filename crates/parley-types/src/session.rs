//! Session status enums.
//!
//! These describe the live state of a voice session as shown next to the
//! transcript: the channel connection, whose turn it is, and what the voice
//! activity detector last reported.

use serde::{Deserialize, Serialize};

/// Connection state of the real-time channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No session, or the last session ended cleanly.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The channel is live.
    Connected,
    /// The last connection attempt failed.
    Error,
}

impl ConnectionStatus {
    /// Returns `true` if a new connection attempt may start.
    pub fn can_connect(self) -> bool {
        !matches!(self, Self::Connecting | Self::Connected)
    }
}

/// Whose turn the conversation is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnIndicator {
    #[default]
    Idle,
    User,
    Assistant,
}

/// Voice activity detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VadState {
    /// No VAD report received yet.
    #[default]
    Idle,
    /// The user is speaking.
    Speech,
    /// The user stopped speaking.
    Silence,
    /// The VAD model failed to load or run.
    Failed,
}

impl VadState {
    /// Maps a platform VAD event name to a state.
    ///
    /// Returns `None` for event names the client does not track.
    pub fn from_event(event: &str) -> Option<Self> {
        match event {
            "vad_start" | "speech" => Some(Self::Speech),
            "vad_end" | "silence" => Some(Self::Silence),
            "vad_model_failed" | "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
