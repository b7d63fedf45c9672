//! Platform tracking runtime seams.
//!
//! The session manager drives the device runtime only through these traits,
//! so hosts plug in their platform binding and tests plug in fakes.

use std::future::Future;
use std::pin::Pin;

use handmux_core::AnchorUpdate;
use tokio_stream::Stream;

/// Raw anchor updates produced by a provider.
pub type AnchorUpdateStream = Pin<Box<dyn Stream<Item = AnchorUpdate> + Send>>;

/// Source of per-hand anchor updates for one session run.
pub trait HandTrackingProvider: Send + Sync + 'static {
    /// Live anchor updates, one per hand per tick.
    ///
    /// The stream ends once the owning session is stopped.
    fn anchor_updates(&self) -> AnchorUpdateStream;
}

/// The platform's sensor tracking session.
pub trait TrackingSession: Send + Sync + 'static {
    type Provider: HandTrackingProvider;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether the current device can track hands at all.
    fn is_hand_tracking_supported(&self) -> bool;

    /// A fresh provider; one is created per active period.
    fn hand_tracking_provider(&self) -> Self::Provider;

    /// Start the session with `provider`, resolving once it is running.
    fn run(
        &self,
        provider: &Self::Provider,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Stop the session. Provider streams terminate afterwards.
    fn stop(&self);
}
