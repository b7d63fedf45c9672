//! Session manager for a shared hand tracking session.
//!
//! Any number of callers may `start()` the manager; the platform session is
//! run once on the first start and stopped when the last caller `stop()`s.
//! Tracked anchors from the provider are republished to every subscriber of
//! the update broadcast channel.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, trace, warn};

use handmux_core::config::SessionConfig;
use handmux_core::HandAnchorUpdate;

use super::lease::HandTrackingLease;
use super::state::{Phase, SessionState, StartOutcome};
use super::types::{SessionError, SessionStats};
use crate::platform::{AnchorUpdateStream, HandTrackingProvider, TrackingSession};

/// Published hand updates for one subscriber.
pub type HandUpdateStream = Pin<Box<dyn Stream<Item = HandAnchorUpdate> + Send>>;

/// Shares one platform tracking session between many callers.
///
/// Construct once per process and hand out clones of the `Arc`.
pub struct HandTrackingSessionManager<S: TrackingSession> {
    session: S,
    state: Mutex<SessionState<S::Provider, S::Error>>,
    updates_tx: broadcast::Sender<HandAnchorUpdate>,
    published: Arc<AtomicU64>,
    config: SessionConfig,
}

/// How a `start()` call was registered.
enum Registration<E> {
    /// The session is already running.
    Joined,
    /// The platform `stop` is in progress; try again.
    Busy,
    /// Another caller is starting the session.
    Wait {
        attempt: u64,
        outcome: watch::Receiver<StartOutcome<E>>,
    },
    /// This caller starts the session.
    Lead { outcome: watch::Sender<StartOutcome<E>> },
}

impl<S: TrackingSession> HandTrackingSessionManager<S> {
    /// Create a new session manager.
    ///
    /// A `broadcast_capacity` of zero is treated as one.
    pub fn new(session: S, config: SessionConfig) -> Self {
        let (updates_tx, _) = broadcast::channel(config.broadcast_capacity.max(1));
        Self {
            session,
            state: Mutex::new(SessionState::new()),
            updates_tx,
            published: Arc::new(AtomicU64::new(0)),
            config,
        }
    }

    /// Create with default configuration.
    pub fn with_defaults(session: S) -> Self {
        Self::new(session, SessionConfig::default())
    }

    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The platform session this manager drives.
    pub const fn session(&self) -> &S {
        &self.session
    }

    /// Register a subscriber, running the platform session if needed.
    ///
    /// Resolves once the session is running. Callers arriving while a start
    /// is in flight are counted immediately and share its outcome; no caller
    /// retries a failed run. On failure every registration made during that
    /// attempt is rolled back, so a failed start must not be paired with
    /// `stop()`.
    pub async fn start(&self) -> Result<(), SessionError<S::Error>> {
        if !self.session.is_hand_tracking_supported() {
            warn!("Hand tracking is not supported on this device");
            return Err(SessionError::HandTrackingNotSupported);
        }

        loop {
            match self.register() {
                Registration::Joined => return Ok(()),
                Registration::Busy => tokio::task::yield_now().await,
                Registration::Wait { attempt, outcome } => {
                    return self.join_start(attempt, outcome).await;
                }
                Registration::Lead { outcome } => return self.lead_start(outcome).await,
            }
        }
    }

    fn register(&self) -> Registration<S::Error> {
        let mut state = self.lock_state();
        if state.phase == Phase::Stopping {
            return Registration::Busy;
        }

        state.subscribers += 1;
        match state.phase {
            Phase::Running => {
                debug!(
                    subscribers = state.subscribers,
                    "Joined running hand tracking session"
                );
                Registration::Joined
            }
            Phase::Starting => Registration::Wait {
                attempt: state.attempt,
                outcome: state.start_outcome.clone(),
            },
            Phase::Stopped | Phase::Stopping => {
                let (outcome, rx) = watch::channel(None);
                state.attempt += 1;
                state.start_outcome = rx;
                state.phase = Phase::Starting;
                Registration::Lead { outcome }
            }
        }
    }

    async fn join_start(
        &self,
        attempt: u64,
        mut outcome: watch::Receiver<StartOutcome<S::Error>>,
    ) -> Result<(), SessionError<S::Error>> {
        debug!(attempt, "Waiting for hand tracking session start in flight");
        let pending = PendingJoin {
            manager: self,
            attempt,
            armed: true,
        };
        let resolved = match outcome.wait_for(Option::is_some).await {
            Ok(resolved) => (*resolved).clone(),
            Err(_) => None,
        };
        pending.disarm();

        match resolved {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(SessionError::Platform(e)),
            None => Err(SessionError::StartCancelled),
        }
    }

    async fn lead_start(
        &self,
        outcome: watch::Sender<StartOutcome<S::Error>>,
    ) -> Result<(), SessionError<S::Error>> {
        let pending = PendingStart {
            manager: self,
            armed: true,
        };
        let provider = self.session.hand_tracking_provider();
        info!("Starting hand tracking session");
        let result = self.session.run(&provider).await;
        pending.disarm();

        let mut state = self.lock_state();
        match result {
            Err(e) => {
                let e = Arc::new(e);
                let abandoned = state.subscribers;
                state.subscribers = 0;
                state.mark_stopped();
                outcome.send_replace(Some(Err(Arc::clone(&e))));
                drop(state);
                warn!(error = %e, abandoned, "Hand tracking session failed to start");
                Err(SessionError::Platform(e))
            }
            Ok(()) if state.subscribers == 0 => {
                state.phase = Phase::Stopping;
                outcome.send_replace(Some(Ok(())));
                drop(state);
                self.stop_platform();
                info!("All subscribers left while starting, hand tracking session stopped");
                Ok(())
            }
            Ok(()) => {
                if let Some(previous) = state.publisher.take()
                    && !previous.is_finished()
                {
                    debug!("Aborting publisher of previous session");
                    previous.abort();
                }
                state.publisher = Some(self.spawn_publisher(provider.anchor_updates()));
                state.provider = Some(provider);
                state.phase = Phase::Running;
                let subscribers = state.subscribers;
                outcome.send_replace(Some(Ok(())));
                drop(state);
                info!(subscribers, "Hand tracking session running");
                Ok(())
            }
        }
    }

    /// Release a subscriber, stopping the platform session after the last one.
    ///
    /// Extra calls with no subscribers left are ignored.
    pub fn stop(&self) {
        let mut state = self.lock_state();
        if state.subscribers == 0 {
            debug!("stop() called with no subscribers, ignoring");
            return;
        }

        state.subscribers -= 1;
        if state.subscribers > 0 {
            debug!(
                subscribers = state.subscribers,
                "Subscriber left hand tracking session"
            );
            return;
        }

        match state.phase {
            Phase::Running => {
                state.phase = Phase::Stopping;
                drop(state);
                self.stop_platform();
                info!("Hand tracking session stopped");
            }
            Phase::Starting => {
                debug!("Last subscriber left during start, stopping once the start resolves");
            }
            Phase::Stopping | Phase::Stopped => {}
        }
    }

    /// Call the platform `stop` without holding the state lock. The phase
    /// must already be `Stopping`.
    fn stop_platform(&self) {
        self.session.stop();
        let released = self.lock_state().mark_stopped();
        drop(released);
    }

    /// Undo the registration of a joining caller that gave up waiting.
    fn abandon_join(&self, attempt: u64) {
        let mut state = self.lock_state();
        if state.attempt != attempt {
            return;
        }
        match state.phase {
            Phase::Starting => {
                state.subscribers = state.subscribers.saturating_sub(1);
                debug!(
                    subscribers = state.subscribers,
                    "Caller stopped waiting for hand tracking start"
                );
            }
            Phase::Running => {
                drop(state);
                self.stop();
            }
            Phase::Stopping | Phase::Stopped => {}
        }
    }

    /// Start and return a lease that stops on drop.
    pub async fn acquire(
        self: &Arc<Self>,
    ) -> Result<HandTrackingLease<S>, SessionError<S::Error>> {
        let updates = self.subscribe();
        self.start().await?;
        Ok(HandTrackingLease::new(Arc::clone(self), updates))
    }

    /// Raw receiver of every update published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<HandAnchorUpdate> {
        self.updates_tx.subscribe()
    }

    /// Stream of published updates.
    ///
    /// A subscriber that falls more than the channel capacity behind loses
    /// the oldest updates and keeps going. Ends once the manager and any
    /// publisher task are gone.
    pub fn updates(&self) -> HandUpdateStream {
        let mut rx = self.updates_tx.subscribe();
        let lag_warn_threshold = self.config.lag_warn_threshold;
        Box::pin(async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(update) => yield update,
                    Err(RecvError::Lagged(skipped)) if skipped > lag_warn_threshold => {
                        warn!(skipped, "Hand update subscriber lagged, skipped updates");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Hand update subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().is_running()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_state().subscribers
    }

    /// Get session statistics.
    pub fn stats(&self) -> SessionStats {
        let state = self.lock_state();
        SessionStats {
            subscribers: state.subscribers,
            running: state.is_running(),
            receivers: self.updates_tx.receiver_count(),
            published: self.published.load(Ordering::Relaxed),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState<S::Provider, S::Error>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_publisher(&self, mut anchor_updates: AnchorUpdateStream) -> JoinHandle<()> {
        let updates_tx = self.updates_tx.clone();
        let published = Arc::clone(&self.published);

        tokio::spawn(async move {
            while let Some(update) = anchor_updates.next().await {
                let chirality = update.anchor.chirality;
                let Some(record) = HandAnchorUpdate::from_anchor(update.anchor) else {
                    trace!(%chirality, event = ?update.event, "Dropping untracked hand anchor");
                    continue;
                };
                published.fetch_add(1, Ordering::Relaxed);
                if let Ok(receivers) = updates_tx.send(record) {
                    trace!(%chirality, receivers, "Hand update published");
                }
            }
            debug!("Hand anchor update stream ended");
        })
    }
}

/// Rolls back a start whose future was dropped while `run` was in flight.
///
/// Callers that joined the attempt are released too; they observe
/// [`SessionError::StartCancelled`] once the outcome sender is dropped.
struct PendingStart<'a, S: TrackingSession> {
    manager: &'a HandTrackingSessionManager<S>,
    armed: bool,
}

impl<S: TrackingSession> PendingStart<'_, S> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<S: TrackingSession> Drop for PendingStart<'_, S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.manager.lock_state();
        let abandoned = state.subscribers;
        state.subscribers = 0;
        state.phase = Phase::Stopping;
        drop(state);
        self.manager.stop_platform();
        warn!(abandoned, "Hand tracking start cancelled");
    }
}

/// Releases a joining caller whose future was dropped while waiting.
struct PendingJoin<'a, S: TrackingSession> {
    manager: &'a HandTrackingSessionManager<S>,
    attempt: u64,
    armed: bool,
}

impl<S: TrackingSession> PendingJoin<'_, S> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<S: TrackingSession> Drop for PendingJoin<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            self.manager.abandon_join(self.attempt);
        }
    }
}
