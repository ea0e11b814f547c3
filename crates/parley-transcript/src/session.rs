//! Voice session: drives the reconciler from a real-time channel.

use crate::error::TransportError;
use crate::event::ChannelEvent;
use crate::reconciler::TurnReconciler;
use parley_types::{
    ConnectionStatus, ConversationEntry, Role, TurnIndicator, VadState,
};
use serde_json::Value;
use std::future::Future;

/// Control surface of the external voice channel.
///
/// Implementations wrap whatever SDK or socket carries audio and
/// notifications. Notifications flow the other way, through
/// [`VoiceSession::handle_json`] or [`VoiceSession::handle_event`].
pub trait VoiceTransport {
    fn connect(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
    fn disconnect(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
    fn mute(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
    fn unmute(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// One client-side voice session.
///
/// All state changes happen through `&mut self`, one notification at a time.
/// Control operations never return errors: failures are logged and shown as
/// `system` entries in the transcript.
#[derive(Debug)]
pub struct VoiceSession<T> {
    transport: T,
    reconciler: TurnReconciler,
    status: ConnectionStatus,
    turn: TurnIndicator,
    vad: VadState,
    muted: bool,
    show_diagnostics: bool,
}

impl<T: VoiceTransport> VoiceSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            reconciler: TurnReconciler::new(),
            status: ConnectionStatus::Disconnected,
            turn: TurnIndicator::Idle,
            vad: VadState::Idle,
            muted: false,
            show_diagnostics: false,
        }
    }

    /// Surfaces unrecognised notifications as `data` entries holding the raw
    /// payload. Off by default; they are only logged.
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.show_diagnostics = enabled;
        self
    }

    /// Starts a new connection attempt.
    ///
    /// Ignored while already connecting or connected. Otherwise the
    /// transcript is reset before the attempt. On failure the transcript is
    /// replaced by a single `"Failed to connect"` entry.
    ///
    /// Returns `true` if the session ended up connected.
    pub async fn connect(&mut self) -> bool {
        if !self.status.can_connect() {
            tracing::debug!(status = ?self.status, "connect ignored, session already active");
            return false;
        }

        self.reconciler.reset_session();
        self.status = ConnectionStatus::Connecting;

        match self.transport.connect().await {
            Ok(()) => {
                self.on_connected();
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "voice channel connection failed");
                self.status = ConnectionStatus::Error;
                self.reconciler.reset_session();
                self.reconciler.push_status("Failed to connect");
                false
            }
        }
    }

    /// Ends the live session. No-op unless connected.
    pub async fn disconnect(&mut self) {
        if !self.is_active() {
            return;
        }
        match self.transport.disconnect().await {
            Ok(()) => self.on_disconnected(),
            Err(e) => {
                tracing::warn!(error = %e, "voice channel disconnect failed");
                self.reconciler
                    .push_status(format!("Failed to disconnect: {}", e));
            }
        }
    }

    /// Mutes the microphone. No-op unless connected.
    pub async fn mute(&mut self) {
        if !self.is_active() {
            return;
        }
        match self.transport.mute().await {
            Ok(()) => self.muted = true,
            Err(e) => {
                tracing::warn!(error = %e, "mute failed");
                self.reconciler.push_status(format!("Failed to mute: {}", e));
            }
        }
    }

    /// Unmutes the microphone. No-op unless connected.
    pub async fn unmute(&mut self) {
        if !self.is_active() {
            return;
        }
        match self.transport.unmute().await {
            Ok(()) => self.muted = false,
            Err(e) => {
                tracing::warn!(error = %e, "unmute failed");
                self.reconciler
                    .push_status(format!("Failed to unmute: {}", e));
            }
        }
    }

    /// Flips the mute state.
    pub async fn toggle_mute(&mut self) {
        if self.muted {
            self.unmute().await;
        } else {
            self.mute().await;
        }
    }

    /// Tears the session down, discarding the transcript and any partial
    /// turns.
    pub async fn shutdown(&mut self) {
        self.disconnect().await;
        self.reconciler.reset_session();
        self.status = ConnectionStatus::Disconnected;
    }

    /// Channel callback: the connection is live.
    pub fn on_connected(&mut self) {
        tracing::info!("voice session connected");
        self.status = ConnectionStatus::Connected;
        self.reconciler.push_status("Connected");
    }

    /// Channel callback: the connection closed, locally or remotely.
    ///
    /// Partial turns are discarded; materialised entries stay visible.
    pub fn on_disconnected(&mut self) {
        tracing::info!(
            pending_turns = self.reconciler.active_turns(),
            "voice session disconnected"
        );
        self.status = ConnectionStatus::Disconnected;
        self.turn = TurnIndicator::Idle;
        self.vad = VadState::Idle;
        self.muted = false;
        self.reconciler.clear_all_turns();
        self.reconciler.push_status("Disconnected");
    }

    /// Parses a raw channel notification and dispatches it.
    pub fn handle_json(&mut self, value: &Value) {
        self.handle_event(ChannelEvent::from_json(value));
    }

    /// Dispatches a parsed channel notification.
    pub fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::TurnStart { role, turn_id } => {
                tracing::trace!(?role, ?turn_id, "turn start");
                self.turn = match role {
                    Some(Role::User) => TurnIndicator::User,
                    Some(Role::Assistant) => TurnIndicator::Assistant,
                    _ => self.turn,
                };
            }
            ChannelEvent::TurnEnd { turn_id, .. } => {
                if let Some(turn_id) = turn_id {
                    self.reconciler.clear_turn(&turn_id);
                }
                self.turn = TurnIndicator::Idle;
            }
            ChannelEvent::TranscriptDelta {
                turn_id,
                counter,
                content,
                ..
            } => {
                self.reconciler
                    .apply_delta(Role::User, turn_id.as_deref(), counter, &content);
            }
            ChannelEvent::TranscriptFinal { turn_id, content } => {
                self.reconciler
                    .apply_delta(Role::User, turn_id.as_deref(), None, &content);
            }
            ChannelEvent::ResponseText { turn_id, content } => {
                self.reconciler
                    .append_whole(Role::Assistant, turn_id.as_deref(), &content);
            }
            ChannelEvent::VoiceActivity(state) => self.vad = state,
            ChannelEvent::MuteChanged { muted } => self.muted = muted,
            ChannelEvent::Unknown { kind, raw } => {
                tracing::debug!(kind = %kind, "ignoring unrecognised channel notification");
                if self.show_diagnostics {
                    self.reconciler
                        .push(ConversationEntry::new(Role::Data, None, raw.to_string()));
                }
            }
        }
    }

    /// Returns `true` while the channel is connected.
    pub fn is_active(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn turn(&self) -> TurnIndicator {
        self.turn
    }

    pub fn vad(&self) -> VadState {
        self.vad
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// The displayed transcript.
    pub fn entries(&self) -> &[ConversationEntry] {
        self.reconciler.entries()
    }

    pub fn reconciler(&self) -> &TurnReconciler {
        &self.reconciler
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
