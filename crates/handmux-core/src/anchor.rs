//! Hand anchor model.
//!
//! Mirrors what the platform hand tracking provider reports for one hand at
//! one instant. The session layer never inspects the pose itself; it only
//! reads the chirality and tracking flag to route and filter updates.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which hand an anchor refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chirality {
    Left,
    Right,
}

impl Chirality {
    pub const fn is_left(self) -> bool {
        matches!(self, Self::Left)
    }

    pub const fn is_right(self) -> bool {
        matches!(self, Self::Right)
    }
}

impl fmt::Display for Chirality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// Column-major 4x4 rigid transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub columns: [[f32; 4]; 4],
}

impl Transform {
    pub const IDENTITY: Self = Self {
        columns: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Pure translation by `(x, y, z)` metres.
    pub const fn from_translation(x: f32, y: f32, z: f32) -> Self {
        let mut t = Self::IDENTITY;
        t.columns[3] = [x, y, z, 1.0];
        t
    }

    pub const fn translation(&self) -> [f32; 3] {
        let c = self.columns[3];
        [c[0], c[1], c[2]]
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Skeleton joints of the platform hand model, in platform order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandJointKind {
    Wrist,
    ThumbKnuckle,
    ThumbIntermediateBase,
    ThumbIntermediateTip,
    ThumbTip,
    IndexFingerMetacarpal,
    IndexFingerKnuckle,
    IndexFingerIntermediateBase,
    IndexFingerIntermediateTip,
    IndexFingerTip,
    MiddleFingerMetacarpal,
    MiddleFingerKnuckle,
    MiddleFingerIntermediateBase,
    MiddleFingerIntermediateTip,
    MiddleFingerTip,
    RingFingerMetacarpal,
    RingFingerKnuckle,
    RingFingerIntermediateBase,
    RingFingerIntermediateTip,
    RingFingerTip,
    LittleFingerMetacarpal,
    LittleFingerKnuckle,
    LittleFingerIntermediateBase,
    LittleFingerIntermediateTip,
    LittleFingerTip,
    ForearmWrist,
    ForearmArm,
}

impl HandJointKind {
    pub const ALL: [Self; 27] = [
        Self::Wrist,
        Self::ThumbKnuckle,
        Self::ThumbIntermediateBase,
        Self::ThumbIntermediateTip,
        Self::ThumbTip,
        Self::IndexFingerMetacarpal,
        Self::IndexFingerKnuckle,
        Self::IndexFingerIntermediateBase,
        Self::IndexFingerIntermediateTip,
        Self::IndexFingerTip,
        Self::MiddleFingerMetacarpal,
        Self::MiddleFingerKnuckle,
        Self::MiddleFingerIntermediateBase,
        Self::MiddleFingerIntermediateTip,
        Self::MiddleFingerTip,
        Self::RingFingerMetacarpal,
        Self::RingFingerKnuckle,
        Self::RingFingerIntermediateBase,
        Self::RingFingerIntermediateTip,
        Self::RingFingerTip,
        Self::LittleFingerMetacarpal,
        Self::LittleFingerKnuckle,
        Self::LittleFingerIntermediateBase,
        Self::LittleFingerIntermediateTip,
        Self::LittleFingerTip,
        Self::ForearmWrist,
        Self::ForearmArm,
    ];
}

/// One joint of a hand skeleton, relative to the hand anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandJoint {
    pub kind: HandJointKind,
    pub is_tracked: bool,
    pub anchor_from_joint: Transform,
}

/// Full hand skeleton as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandSkeleton {
    joints: Vec<HandJoint>,
}

impl HandSkeleton {
    pub const fn new(joints: Vec<HandJoint>) -> Self {
        Self { joints }
    }

    /// Skeleton in the platform's neutral pose: every joint tracked at the anchor origin.
    pub fn neutral() -> Self {
        Self::new(
            HandJointKind::ALL
                .iter()
                .map(|&kind| HandJoint {
                    kind,
                    is_tracked: true,
                    anchor_from_joint: Transform::IDENTITY,
                })
                .collect(),
        )
    }

    pub fn joint(&self, kind: HandJointKind) -> Option<&HandJoint> {
        self.joints.iter().find(|j| j.kind == kind)
    }

    pub fn joints(&self) -> &[HandJoint] {
        &self.joints
    }
}

/// Snapshot of one tracked hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandAnchor {
    pub id: Uuid,
    pub chirality: Chirality,
    pub is_tracked: bool,
    pub origin_from_anchor: Transform,
    pub skeleton: Option<HandSkeleton>,
}

impl HandAnchor {
    /// New tracked anchor at the origin with no skeleton.
    pub fn new(chirality: Chirality) -> Self {
        Self {
            id: Uuid::new_v4(),
            chirality,
            is_tracked: true,
            origin_from_anchor: Transform::IDENTITY,
            skeleton: None,
        }
    }

    #[must_use]
    pub fn tracked(mut self, is_tracked: bool) -> Self {
        self.is_tracked = is_tracked;
        self
    }

    #[must_use]
    pub fn with_transform(mut self, origin_from_anchor: Transform) -> Self {
        self.origin_from_anchor = origin_from_anchor;
        self
    }

    #[must_use]
    pub fn with_skeleton(mut self, skeleton: HandSkeleton) -> Self {
        self.skeleton = Some(skeleton);
        self
    }
}

/// Lifecycle event attached to a raw provider update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorEvent {
    Added,
    Updated,
    Removed,
}

/// One raw item from the provider's anchor update stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorUpdate {
    pub event: AnchorEvent,
    pub anchor: HandAnchor,
    /// Time since the session started running.
    pub timestamp: Duration,
}

impl AnchorUpdate {
    pub const fn new(event: AnchorEvent, anchor: HandAnchor, timestamp: Duration) -> Self {
        Self {
            event,
            anchor,
            timestamp,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn chirality_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Chirality::Left).unwrap(), "\"left\"");
        assert_eq!(Chirality::Right.to_string(), "right");
    }

    #[test]
    fn translation_round_trips_through_transform() {
        let t = Transform::from_translation(0.1, -0.2, 0.3);
        assert_eq!(t.translation(), [0.1, -0.2, 0.3]);
        assert_eq!(Transform::default(), Transform::IDENTITY);
    }

    #[test]
    fn neutral_skeleton_has_every_joint() {
        let skeleton = HandSkeleton::neutral();
        assert_eq!(skeleton.joints().len(), HandJointKind::ALL.len());
        let tip = skeleton.joint(HandJointKind::IndexFingerTip).unwrap();
        assert!(tip.is_tracked);
    }

    #[test]
    fn anchor_builder_sets_fields() {
        let anchor = HandAnchor::new(Chirality::Left)
            .tracked(false)
            .with_transform(Transform::from_translation(1.0, 0.0, 0.0))
            .with_skeleton(HandSkeleton::neutral());
        assert!(!anchor.is_tracked);
        assert!(anchor.chirality.is_left());
        assert_eq!(anchor.origin_from_anchor.translation(), [1.0, 0.0, 0.0]);
        assert!(anchor.skeleton.is_some());
    }

    #[test]
    fn anchor_update_deserializes_from_json() {
        let update = AnchorUpdate::new(
            AnchorEvent::Updated,
            HandAnchor::new(Chirality::Right),
            Duration::from_millis(16),
        );
        let json = serde_json::to_string(&update).unwrap();
        let parsed: AnchorUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, update);
    }
}
