//! `handmux` Core Library
//!
//! Shared functionality for `handmux` components:
//! - Hand anchor model delivered by the platform tracking provider
//! - The per-tick hand update record fanned out to subscribers
//! - Configuration resolution and hierarchy
//! - Common error types and tracing setup

pub mod anchor;
pub mod config;
pub mod error;
pub mod tracing_init;
pub mod update;

pub use anchor::{
    AnchorEvent, AnchorUpdate, Chirality, HandAnchor, HandJoint, HandJointKind, HandSkeleton,
    Transform,
};
pub use config::Config;
pub use error::{Error, Result};
pub use update::HandAnchorUpdate;
