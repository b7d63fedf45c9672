//! Scoped subscriptions to the shared session.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use handmux_core::HandAnchorUpdate;

use super::multiplexer::HandTrackingSessionManager;
use crate::platform::TrackingSession;

/// A started subscription that releases itself when dropped.
///
/// Obtained from [`HandTrackingSessionManager::acquire`]. Holding a lease
/// keeps the platform session running; dropping it performs the matching
/// `stop()`.
pub struct HandTrackingLease<S: TrackingSession> {
    manager: Arc<HandTrackingSessionManager<S>>,
    updates: broadcast::Receiver<HandAnchorUpdate>,
}

impl<S: TrackingSession> HandTrackingLease<S> {
    pub(crate) const fn new(
        manager: Arc<HandTrackingSessionManager<S>>,
        updates: broadcast::Receiver<HandAnchorUpdate>,
    ) -> Self {
        Self { manager, updates }
    }

    /// Next published update, skipping any this lease lagged behind on.
    ///
    /// The lease keeps the manager, and with it the sending side of the
    /// channel, alive, so this never returns `None` while the lease exists.
    pub async fn recv(&mut self) -> Option<HandAnchorUpdate> {
        loop {
            match self.updates.recv().await {
                Ok(update) => return Some(update),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Hand tracking lease lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// The raw broadcast receiver backing this lease.
    pub const fn receiver(&mut self) -> &mut broadcast::Receiver<HandAnchorUpdate> {
        &mut self.updates
    }

    pub const fn manager(&self) -> &Arc<HandTrackingSessionManager<S>> {
        &self.manager
    }
}

impl<S: TrackingSession> Drop for HandTrackingLease<S> {
    fn drop(&mut self) {
        self.manager.stop();
    }
}
