//! handmux Session Library
//!
//! Shares one platform hand tracking session between any number of
//! in-process consumers:
//! - Reference-counted start/stop of the underlying session
//! - Fan-out of tracked hand updates to every subscriber
//! - RAII leases that release their subscription on drop

pub mod platform;
pub mod session;

pub use platform::{AnchorUpdateStream, HandTrackingProvider, TrackingSession};
pub use session::{
    HandTrackingLease, HandTrackingSessionManager, HandUpdateStream, SessionError, SessionStats,
};
