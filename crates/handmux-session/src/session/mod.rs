//! Shared hand tracking session management.
//!
//! Counts subscribers of a single platform session and fans out its updates.

mod lease;
mod multiplexer;
mod state;
mod types;

pub use lease::HandTrackingLease;
pub use multiplexer::{HandTrackingSessionManager, HandUpdateStream};
pub use types::{SessionError, SessionStats};
