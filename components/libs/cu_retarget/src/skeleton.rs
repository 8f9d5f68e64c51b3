//! Source skeleton access.
//!
//! The retargeter only needs world rotations of a fixed set of humanoid
//! bones.  Anything able to answer that (an animation runtime, a motion
//! capture stream, a recorded file) implements [`SkeletonSource`].

use glam::Quat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::RetargetResult;

/// Humanoid bones read by the retargeter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HumanBone {
    Hips,
    Spine,
    Chest,
    Head,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightUpperArm,
    RightLowerArm,
    RightHand,
    LeftUpperLeg,
    LeftLowerLeg,
    LeftFoot,
    RightUpperLeg,
    RightLowerLeg,
    RightFoot,
}

impl HumanBone {
    pub const ALL: [HumanBone; 16] = [
        Self::Hips,
        Self::Spine,
        Self::Chest,
        Self::Head,
        Self::LeftUpperArm,
        Self::LeftLowerArm,
        Self::LeftHand,
        Self::RightUpperArm,
        Self::RightLowerArm,
        Self::RightHand,
        Self::LeftUpperLeg,
        Self::LeftLowerLeg,
        Self::LeftFoot,
        Self::RightUpperLeg,
        Self::RightLowerLeg,
        Self::RightFoot,
    ];
}

impl fmt::Display for HumanBone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Read access to the source skeleton's current pose.
pub trait SkeletonSource {
    /// World rotation of `bone`, or `None` if the rig lacks it.
    fn bone_rotation(&self, bone: HumanBone) -> Option<Quat>;
}

/// A captured skeleton pose.
///
/// Serializes as `{"bones": {"Head": [x, y, z, w], ...}}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseSnapshot {
    pub bones: BTreeMap<HumanBone, Quat>,
}

impl PoseSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every bone present with the same world rotation.
    pub fn uniform(rotation: Quat) -> Self {
        Self {
            bones: HumanBone::ALL.into_iter().map(|b| (b, rotation)).collect(),
        }
    }

    pub fn with_bone(mut self, bone: HumanBone, rotation: Quat) -> Self {
        self.bones.insert(bone, rotation);
        self
    }

    pub fn set(&mut self, bone: HumanBone, rotation: Quat) {
        self.bones.insert(bone, rotation);
    }

    /// Drop a bone, as on rigs lacking it.
    pub fn remove(&mut self, bone: HumanBone) {
        self.bones.remove(&bone);
    }

    /// Load a sequence of poses from a JSON array.
    pub fn load_sequence(path: &Path) -> RetargetResult<Vec<Self>> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl SkeletonSource for PoseSnapshot {
    fn bone_rotation(&self, bone: HumanBone) -> Option<Quat> {
        self.bones.get(&bone).copied()
    }
}
