//! Session manager types.

use std::sync::Arc;

/// Session manager statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Callers holding a started subscription.
    pub subscribers: usize,
    /// Whether the underlying session is running.
    pub running: bool,
    /// Live receivers on the update broadcast channel.
    pub receivers: usize,
    /// Records published since the manager was created.
    pub published: u64,
}

/// Session manager errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError<E> {
    #[error("Hand tracking is not supported on this device")]
    HandTrackingNotSupported,

    /// The platform refused to run. Every caller that joined the same start
    /// attempt receives the same error.
    #[error("Tracking session failed to start: {0}")]
    Platform(#[source] Arc<E>),

    /// The caller that was starting the session gave up before it resolved.
    #[error("Tracking session start was cancelled")]
    StartCancelled,
}
