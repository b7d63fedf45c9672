//! Session state management.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Result of a start attempt, `None` while `run` is in flight.
pub(crate) type StartOutcome<E> = Option<Result<(), Arc<E>>>;

/// Lifecycle of the underlying platform session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Stopped,
    /// `run` is in flight; callers arriving now join it.
    Starting,
    Running,
    /// The platform `stop` is being called outside the state lock.
    Stopping,
}

/// Mutable state guarded by the manager's state lock.
pub(crate) struct SessionState<P, E> {
    pub subscribers: usize,
    pub phase: Phase,
    /// Incremented each time a start attempt begins.
    pub attempt: u64,
    /// Outcome of the current start attempt, cloned by joining callers.
    pub start_outcome: watch::Receiver<StartOutcome<E>>,
    /// Provider of the current active period, kept alive while running.
    pub provider: Option<P>,
    /// Publisher task of the most recent active period.
    pub publisher: Option<JoinHandle<()>>,
}

impl<P, E> SessionState<P, E> {
    pub fn new() -> Self {
        let (_, start_outcome) = watch::channel(None);
        Self {
            subscribers: 0,
            phase: Phase::Stopped,
            attempt: 0,
            start_outcome,
            provider: None,
            publisher: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Enter the stopped phase, handing back the provider for the caller to drop.
    pub fn mark_stopped(&mut self) -> Option<P> {
        self.phase = Phase::Stopped;
        self.provider.take()
    }
}
