//! Fake platform session for driving the manager in tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use handmux_core::{AnchorEvent, AnchorUpdate, Chirality, HandAnchor};
use handmux_session::{AnchorUpdateStream, HandTrackingProvider, TrackingSession};

#[derive(Debug, thiserror::Error)]
#[error("tracking session refused to run: {0}")]
pub struct FakeError(pub String);

pub struct FakeProvider {
    rx: Mutex<Option<mpsc::Receiver<AnchorUpdate>>>,
}

impl HandTrackingProvider for FakeProvider {
    fn anchor_updates(&self) -> AnchorUpdateStream {
        match self.rx.lock().unwrap().take() {
            Some(rx) => Box::pin(ReceiverStream::new(rx)),
            None => Box::pin(tokio_stream::empty::<AnchorUpdate>()),
        }
    }
}

/// In-memory tracking session. Anchors pushed with [`FakeSession::emit`]
/// reach the running provider's stream; `stop()` closes that stream.
pub struct FakeSession {
    supported: bool,
    run_delay: Duration,
    failures_left: AtomicUsize,
    runs: AtomicUsize,
    stops: AtomicUsize,
    providers: AtomicUsize,
    pending_feed: Mutex<Option<mpsc::Sender<AnchorUpdate>>>,
    feed: Mutex<Option<mpsc::Sender<AnchorUpdate>>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            supported: true,
            run_delay: Duration::ZERO,
            failures_left: AtomicUsize::new(0),
            runs: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            providers: AtomicUsize::new(0),
            pending_feed: Mutex::new(None),
            feed: Mutex::new(None),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_run_delay(mut self, delay: Duration) -> Self {
        self.run_delay = delay;
        self
    }

    /// Make the next `n` runs fail.
    pub fn fail_next_runs(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn providers(&self) -> usize {
        self.providers.load(Ordering::SeqCst)
    }

    /// Deliver a raw anchor update. Returns `false` when no session is running.
    pub async fn emit(&self, update: AnchorUpdate) -> bool {
        let feed = self.feed.lock().unwrap().clone();
        match feed {
            Some(tx) => tx.send(update).await.is_ok(),
            None => false,
        }
    }
}

impl TrackingSession for FakeSession {
    type Provider = FakeProvider;
    type Error = FakeError;

    fn is_hand_tracking_supported(&self) -> bool {
        self.supported
    }

    fn hand_tracking_provider(&self) -> FakeProvider {
        self.providers.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(64);
        *self.pending_feed.lock().unwrap() = Some(tx);
        FakeProvider {
            rx: Mutex::new(Some(rx)),
        }
    }

    async fn run(&self, _provider: &FakeProvider) -> Result<(), FakeError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if !self.run_delay.is_zero() {
            tokio::time::sleep(self.run_delay).await;
        }
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(FakeError("sensor unavailable".to_string()));
        }
        let tx = self.pending_feed.lock().unwrap().take();
        *self.feed.lock().unwrap() = tx;
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.feed.lock().unwrap().take();
        self.pending_feed.lock().unwrap().take();
    }
}

pub fn tick(chirality: Chirality, tracked: bool, millis: u64) -> AnchorUpdate {
    AnchorUpdate::new(
        AnchorEvent::Updated,
        HandAnchor::new(chirality).tracked(tracked),
        Duration::from_millis(millis),
    )
}
