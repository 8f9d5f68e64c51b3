//! Rest pose of the source skeleton.
//!
//! Every chain works on bone rotations relative to the rotation the bone
//! had, inside its chain root, when the skeleton stood in its reference
//! T-pose.  [`RestPose::record`] captures those reference rotations
//! (inverted, as they are always used that way).
//!
//! Recording assumes the skeleton really is in its T-pose.  Nothing can
//! check that: a skewed rest pose silently skews every later frame.

use crate::error::{RetargetError, RetargetResult};
use crate::skeleton::{HumanBone, SkeletonSource};
use glam::Quat;
use log::{info, warn};
use std::collections::BTreeMap;

/// Candidates for the upper-body root, most preferred first.
pub const UPPER_ROOT_CANDIDATES: [HumanBone; 3] = [HumanBone::Chest, HumanBone::Spine, HumanBone::Hips];

/// Candidates for the lower-body root, most preferred first.
pub const LOWER_ROOT_CANDIDATES: [HumanBone; 2] = [HumanBone::Spine, HumanBone::Hips];

/// Bones recorded relative to the upper-body root.
const UPPER_BODY_BONES: [HumanBone; 7] = [
    HumanBone::Head,
    HumanBone::RightUpperArm,
    HumanBone::RightLowerArm,
    HumanBone::RightHand,
    HumanBone::LeftUpperArm,
    HumanBone::LeftLowerArm,
    HumanBone::LeftHand,
];

/// Bones recorded relative to the lower-body root.
const LOWER_BODY_BONES: [HumanBone; 6] = [
    HumanBone::RightUpperLeg,
    HumanBone::RightLowerLeg,
    HumanBone::RightFoot,
    HumanBone::LeftUpperLeg,
    HumanBone::LeftLowerLeg,
    HumanBone::LeftFoot,
];

/// First candidate bone the skeleton has, with its world rotation.
pub fn resolve_root<S>(skeleton: &S, candidates: &[HumanBone]) -> RetargetResult<(HumanBone, Quat)>
where
    S: SkeletonSource + ?Sized,
{
    for (i, &bone) in candidates.iter().enumerate() {
        if let Some(rotation) = skeleton.bone_rotation(bone) {
            if i > 0 {
                warn!("no {} bone, using {} as chain root", candidates[0], bone);
            }
            return Ok((bone, rotation));
        }
    }
    Err(RetargetError::MissingBone(candidates[candidates.len() - 1]))
}

/// World rotation of a bone the rig must have.
pub(crate) fn required_bone<S>(skeleton: &S, bone: HumanBone) -> RetargetResult<Quat>
where
    S: SkeletonSource + ?Sized,
{
    skeleton.bone_rotation(bone).ok_or(RetargetError::MissingBone(bone))
}

/// Inverse rest rotations, keyed by bone.
#[derive(Debug, Clone, PartialEq)]
pub struct RestPose {
    inverse: BTreeMap<HumanBone, Quat>,
    upper_root: HumanBone,
    lower_root: HumanBone,
}

impl RestPose {
    /// Capture the rest pose from a skeleton standing in its T-pose.
    pub fn record<S>(skeleton: &S) -> RetargetResult<Self>
    where
        S: SkeletonSource + ?Sized,
    {
        let (upper_root, upper_rotation) = resolve_root(skeleton, &UPPER_ROOT_CANDIDATES)?;
        let (lower_root, lower_rotation) = resolve_root(skeleton, &LOWER_ROOT_CANDIDATES)?;

        let mut rest = Self {
            inverse: BTreeMap::new(),
            upper_root,
            lower_root,
        };

        // The chest chain is evaluated against the lower-body root.
        rest.add(upper_root, lower_rotation.inverse(), upper_rotation);

        let inv_upper = upper_rotation.inverse();
        for bone in UPPER_BODY_BONES {
            rest.add(bone, inv_upper, required_bone(skeleton, bone)?);
        }
        let inv_lower = lower_rotation.inverse();
        for bone in LOWER_BODY_BONES {
            rest.add(bone, inv_lower, required_bone(skeleton, bone)?);
        }

        info!(
            "recorded rest pose of {} bones (upper root {}, lower root {})",
            rest.inverse.len(),
            upper_root,
            lower_root
        );
        Ok(rest)
    }

    fn add(&mut self, bone: HumanBone, inv_parent: Quat, rotation: Quat) {
        let relative = (inv_parent * rotation).normalize();
        self.inverse.insert(bone, relative.inverse());
    }

    /// Inverse rest rotation of `bone` relative to its chain root.
    pub fn inverse(&self, bone: HumanBone) -> RetargetResult<Quat> {
        self.inverse
            .get(&bone)
            .copied()
            .ok_or(RetargetError::MissingBone(bone))
    }

    /// Root of the head and arm chains.
    pub fn upper_root(&self) -> HumanBone {
        self.upper_root
    }

    /// Root of the chest and leg chains.
    pub fn lower_root(&self) -> HumanBone {
        self.lower_root
    }

    pub fn len(&self) -> usize {
        self.inverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inverse.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::PoseSnapshot;

    fn assert_same_rotation(a: Quat, b: Quat) {
        assert!((1.0 - a.dot(b).abs()) < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn records_relative_inverse_rotations() {
        let chest = Quat::from_rotation_y(0.4);
        let arm = Quat::from_rotation_z(-0.3) * chest;
        let pose = PoseSnapshot::uniform(Quat::IDENTITY)
            .with_bone(HumanBone::Chest, chest)
            .with_bone(HumanBone::RightUpperArm, arm);
        let rest = RestPose::record(&pose).unwrap();
        assert_eq!(rest.upper_root(), HumanBone::Chest);
        assert_eq!(rest.lower_root(), HumanBone::Spine);
        // chest⁻¹ * arm
        let expected = (chest.inverse() * arm).inverse();
        assert_same_rotation(rest.inverse(HumanBone::RightUpperArm).unwrap(), expected);
        // chest relative to the spine
        assert_same_rotation(rest.inverse(HumanBone::Chest).unwrap(), chest.inverse());
        assert_eq!(rest.len(), 14);
    }

    #[test]
    fn falls_back_when_chest_is_missing() {
        let mut pose = PoseSnapshot::uniform(Quat::IDENTITY);
        pose.remove(HumanBone::Chest);
        let rest = RestPose::record(&pose).unwrap();
        assert_eq!(rest.upper_root(), HumanBone::Spine);
        assert_eq!(rest.lower_root(), HumanBone::Spine);

        pose.remove(HumanBone::Spine);
        let rest = RestPose::record(&pose).unwrap();
        assert_eq!(rest.upper_root(), HumanBone::Hips);
        assert_eq!(rest.lower_root(), HumanBone::Hips);
    }

    #[test]
    fn fails_without_any_root() {
        let mut pose = PoseSnapshot::uniform(Quat::IDENTITY);
        for bone in UPPER_ROOT_CANDIDATES {
            pose.remove(bone);
        }
        assert!(matches!(
            RestPose::record(&pose),
            Err(RetargetError::MissingBone(HumanBone::Hips))
        ));
    }

    #[test]
    fn fails_on_missing_limb() {
        let mut pose = PoseSnapshot::uniform(Quat::IDENTITY);
        pose.remove(HumanBone::LeftFoot);
        assert!(matches!(
            RestPose::record(&pose),
            Err(RetargetError::MissingBone(HumanBone::LeftFoot))
        ));
    }
}
