//! Per-tick hand update record.

use serde::{Deserialize, Serialize};

use crate::anchor::{AnchorUpdate, Chirality, HandAnchor};

/// What is known about each hand as of one provider tick.
///
/// Each side is independently present or absent. Records published by the
/// session manager carry exactly one side, because the provider reports one
/// anchor per hand per tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandAnchorUpdate {
    left: Option<HandAnchor>,
    right: Option<HandAnchor>,
}

impl HandAnchorUpdate {
    pub const fn new(left: Option<HandAnchor>, right: Option<HandAnchor>) -> Self {
        Self { left, right }
    }

    /// Build the record published for a single provider anchor.
    ///
    /// Returns `None` when the anchor is not tracked.
    pub fn from_anchor(anchor: HandAnchor) -> Option<Self> {
        anchor.is_tracked.then(|| Self::single(anchor))
    }

    fn single(anchor: HandAnchor) -> Self {
        match anchor.chirality {
            Chirality::Left => Self::new(Some(anchor), None),
            Chirality::Right => Self::new(None, Some(anchor)),
        }
    }

    pub const fn left(&self) -> Option<&HandAnchor> {
        self.left.as_ref()
    }

    pub const fn right(&self) -> Option<&HandAnchor> {
        self.right.as_ref()
    }

    pub const fn hand(&self, chirality: Chirality) -> Option<&HandAnchor> {
        match chirality {
            Chirality::Left => self.left(),
            Chirality::Right => self.right(),
        }
    }

    /// True when neither hand is present.
    pub const fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Present anchors, left first.
    pub fn anchors(&self) -> impl Iterator<Item = &HandAnchor> {
        self.left.iter().chain(self.right.iter())
    }
}

impl TryFrom<AnchorUpdate> for HandAnchorUpdate {
    type Error = AnchorUpdate;

    /// Hands back the raw update when its anchor is untracked.
    fn try_from(update: AnchorUpdate) -> Result<Self, Self::Error> {
        if update.anchor.is_tracked {
            Ok(Self::single(update.anchor))
        } else {
            Err(update)
        }
    }
}
