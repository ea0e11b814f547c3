//! Error types for the voice channel seam.

/// Errors reported by a [`VoiceTransport`](crate::VoiceTransport).
///
/// The session never propagates these; it turns them into status entries.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening the channel failed (authorization, network, permissions).
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Other(String),
}
