//! Transcript reconciliation for the Parley voice-agent client.
//!
//! The real-time voice channel reports speech as a stream of small,
//! possibly-reordered notifications. This crate turns that stream into a
//! stable transcript: one entry per conversational turn per role, in
//! first-appearance order, with each turn's text rebuilt from its chunks in
//! delta-counter order.
//!
//! # Notification kinds
//!
//! | `type` | Effect |
//! |--------|--------|
//! | `user.transcript.delta`, `user.transcript.interim_delta` | store chunk, rebuild user turn |
//! | `user.transcript` | replace user turn text |
//! | `response.text` | append to assistant turn |
//! | `turn.start` / `turn.end` | turn indicator; `turn.end` drops the turn's chunks |
//! | `vad_events` | voice activity state |
//! | `mute` / `unmute` | mute state |
//!
//! Anything else is logged and otherwise ignored.
//!
//! # Usage
//!
//! ```rust
//! use parley_transcript::TurnReconciler;
//! use parley_types::Role;
//!
//! let mut reconciler = TurnReconciler::new();
//! reconciler.apply_delta(Role::User, Some("t1"), Some(3), "lo");
//! reconciler.apply_delta(Role::User, Some("t1"), Some(1), "He");
//! reconciler.apply_delta(Role::User, Some("t1"), Some(2), "l");
//! assert_eq!(reconciler.entries()[0].text, "Hello");
//! ```

mod error;
mod event;
mod reconciler;
mod session;

pub use error::TransportError;
pub use event::{coerce_counter, coerce_turn_id, ChannelEvent};
pub use reconciler::TurnReconciler;
pub use session::{VoiceSession, VoiceTransport};

#[cfg(test)]
mod tests;
