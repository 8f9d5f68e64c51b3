//! Per-chain updaters.
//!
//! Each updater reads the bones of one kinematic chain, expresses them
//! relative to the chain root and to the rest pose, and drives the chain's
//! joints from the root outwards.  Chains that span several bones carry
//! the inverse of the rotation the joints actually reached, so a clamped
//! joint upstream is compensated by the joints after it.

use crate::decompose::{
    apply_direct_rotation, apply_partial_rotation, apply_partial_rotation_accumulated,
    to_degrees,
};
use crate::error::RetargetResult;
use crate::joint::{JointPosition, Side};
use crate::rest_pose::{RestPose, required_bone};
use crate::servo::ServoBank;
use crate::skeleton::{HumanBone, SkeletonSource};
use glam::{EulerRot, Quat, Vec3};
use log::trace;

/// Bones read by the chains, besides the chain roots.
const DRIVING_BONES: [HumanBone; 11] = [
    HumanBone::Head,
    HumanBone::RightUpperArm,
    HumanBone::RightLowerArm,
    HumanBone::LeftUpperArm,
    HumanBone::LeftLowerArm,
    HumanBone::RightUpperLeg,
    HumanBone::RightLowerLeg,
    HumanBone::RightFoot,
    HumanBone::LeftUpperLeg,
    HumanBone::LeftLowerLeg,
    HumanBone::LeftFoot,
];

/// Everything a chain needs to read one frame of the source skeleton.
pub struct Frame<'a, S: SkeletonSource + ?Sized> {
    skeleton: &'a S,
    rest: &'a RestPose,
    /// Inverse world rotation of the upper-body root.
    inv_upper: Quat,
    /// Inverse world rotation of the lower-body root.
    inv_lower: Quat,
}

impl<'a, S: SkeletonSource + ?Sized> Frame<'a, S> {
    /// Resolve the chain roots the rest pose was recorded against.
    ///
    /// Fails before any servo is driven if the skeleton lacks one of the
    /// bones the chains read.
    pub fn new(skeleton: &'a S, rest: &'a RestPose) -> RetargetResult<Self> {
        let upper = required_bone(skeleton, rest.upper_root())?.normalize();
        let lower = required_bone(skeleton, rest.lower_root())?.normalize();
        for bone in DRIVING_BONES {
            required_bone(skeleton, bone)?;
        }
        Ok(Self {
            skeleton,
            rest,
            inv_upper: upper.inverse(),
            inv_lower: lower.inverse(),
        })
    }

    /// World rotation of `bone`, brought back to unit length.
    fn bone(&self, bone: HumanBone) -> RetargetResult<Quat> {
        Ok(required_bone(self.skeleton, bone)?.normalize())
    }

    /// Bone rotation relative to the upper-body root and its rest pose.
    fn upper_relative(&self, bone: HumanBone) -> RetargetResult<Quat> {
        Ok(self.inv_upper * self.bone(bone)? * self.rest.inverse(bone)?)
    }

    /// Bone rotation relative to the lower-body root and its rest pose.
    fn lower_relative(&self, bone: HumanBone) -> RetargetResult<Quat> {
        Ok(self.inv_lower * self.bone(bone)? * self.rest.inverse(bone)?)
    }
}

/// Angle a joint already holds, expressed in the source frame.
fn held_angle(bank: &ServoBank, joint: JointPosition) -> f32 {
    let servo = bank.servo(joint);
    servo.angle() * servo.direction()
}

/// Chest yaw, from the upper-body root relative to the lower-body root.
pub fn update_chest<S>(frame: &Frame<'_, S>, bank: &mut ServoBank) -> RetargetResult<()>
where
    S: SkeletonSource + ?Sized,
{
    let root = frame.rest.upper_root();
    let rot = frame.rest.inverse(root)? * frame.inv_lower * frame.bone(root)?;
    apply_partial_rotation(rot, JointPosition::ChestYaw, bank);
    Ok(())
}

/// Head yaw, from the head relative to the upper-body root.
pub fn update_head<S>(frame: &Frame<'_, S>, bank: &mut ServoBank) -> RetargetResult<()>
where
    S: SkeletonSource + ?Sized,
{
    let rot = frame.rest.inverse(HumanBone::Head)? * frame.inv_upper * frame.bone(HumanBone::Head)?;
    apply_partial_rotation(rot, JointPosition::HeadYaw, bank);
    Ok(())
}

/// Joints and bones of one arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmJoints {
    pub side: Side,
    pub shoulder_pitch: JointPosition,
    pub shoulder_roll: JointPosition,
    pub elbow_yaw: JointPosition,
    pub lower_arm_pitch: JointPosition,
    pub upper_arm: HumanBone,
    pub lower_arm: HumanBone,
}

impl ArmJoints {
    pub const fn of(side: Side) -> Self {
        match side {
            Side::Right => Self {
                side,
                shoulder_pitch: JointPosition::RightShoulderPitch,
                shoulder_roll: JointPosition::RightShoulderRoll,
                elbow_yaw: JointPosition::RightElbowYaw,
                lower_arm_pitch: JointPosition::RightLowerArmPitch,
                upper_arm: HumanBone::RightUpperArm,
                lower_arm: HumanBone::RightLowerArm,
            },
            Side::Left => Self {
                side,
                shoulder_pitch: JointPosition::LeftShoulderPitch,
                shoulder_roll: JointPosition::LeftShoulderRoll,
                elbow_yaw: JointPosition::LeftElbowYaw,
                lower_arm_pitch: JointPosition::LeftLowerArmPitch,
                upper_arm: HumanBone::LeftUpperArm,
                lower_arm: HumanBone::LeftLowerArm,
            },
        }
    }
}

/// Shoulder `(pitch, roll)` in degrees placing the bone's X axis on `xt`.
///
/// The left side mirrors the right one through the YZ plane.
pub fn shoulder_angles(side: Side, xt: Vec3) -> (f32, f32) {
    let s = (xt.y * xt.y + xt.z * xt.z).sqrt();
    let (pitch, roll) = match side {
        Side::Right => (-xt.z.atan2(-xt.y), -s.atan2(xt.x)),
        Side::Left => (xt.z.atan2(xt.y), s.atan2(xt.x)),
    };
    (to_degrees(pitch), to_degrees(roll))
}

/// Elbow `(yaw, pitch)` in degrees placing the forearm's X axis on `xt`.
pub fn elbow_angles(side: Side, xt: Vec3) -> (f32, f32) {
    let s = (xt.y * xt.y + xt.z * xt.z).sqrt();
    let yaw = match side {
        Side::Right => -xt.y.atan2(xt.z),
        Side::Left => (-xt.y).atan2(-xt.z),
    };
    (to_degrees(yaw), to_degrees(-s.atan2(xt.x)))
}

/// Shoulder and elbow of one arm.
///
/// The arm is solved by pointing: the shoulder aims the upper arm, the
/// elbow aims the forearm in the frame the shoulder actually reached.
/// When the bending joint is within `threshold` degrees of straight, the
/// twisting joint before it is undetermined and keeps its previous angle.
pub fn update_arm<S>(
    frame: &Frame<'_, S>,
    arm: ArmJoints,
    threshold: f32,
    bank: &mut ServoBank,
) -> RetargetResult<()>
where
    S: SkeletonSource + ?Sized,
{
    let rot = frame.upper_relative(arm.upper_arm)?;
    let (mut pitch, roll) = shoulder_angles(arm.side, rot * Vec3::X);
    if roll.abs() < threshold {
        pitch = held_angle(bank, arm.shoulder_pitch);
        trace!("{:?} arm straight, holding shoulder pitch at {pitch}", arm.side);
    }
    let inv = apply_direct_rotation(Quat::IDENTITY, pitch, arm.shoulder_pitch, bank);
    let inv = apply_direct_rotation(inv, roll, arm.shoulder_roll, bank);

    let rot = inv * frame.upper_relative(arm.lower_arm)?;
    let (mut yaw, pitch) = elbow_angles(arm.side, rot * Vec3::X);
    if pitch.abs() < threshold {
        yaw = held_angle(bank, arm.elbow_yaw);
        trace!("{:?} elbow straight, holding yaw at {yaw}", arm.side);
    }
    let inv = apply_direct_rotation(inv, yaw, arm.elbow_yaw, bank);
    apply_direct_rotation(inv, pitch, arm.lower_arm_pitch, bank);
    Ok(())
}

/// Joints and bones of one leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegJoints {
    pub hip_yaw: JointPosition,
    pub hip_roll: JointPosition,
    pub upper_leg_pitch: JointPosition,
    pub lower_leg_pitch: JointPosition,
    pub foot_pitch: JointPosition,
    pub foot_roll: JointPosition,
    pub upper_leg: HumanBone,
    pub lower_leg: HumanBone,
    pub foot: HumanBone,
}

impl LegJoints {
    pub const fn of(side: Side) -> Self {
        match side {
            Side::Right => Self {
                hip_yaw: JointPosition::RightHipYaw,
                hip_roll: JointPosition::RightHipRoll,
                upper_leg_pitch: JointPosition::RightUpperLegPitch,
                lower_leg_pitch: JointPosition::RightLowerLegPitch,
                foot_pitch: JointPosition::RightFootPitch,
                foot_roll: JointPosition::RightFootRoll,
                upper_leg: HumanBone::RightUpperLeg,
                lower_leg: HumanBone::RightLowerLeg,
                foot: HumanBone::RightFoot,
            },
            Side::Left => Self {
                hip_yaw: JointPosition::LeftHipYaw,
                hip_roll: JointPosition::LeftHipRoll,
                upper_leg_pitch: JointPosition::LeftUpperLegPitch,
                lower_leg_pitch: JointPosition::LeftLowerLegPitch,
                foot_pitch: JointPosition::LeftFootPitch,
                foot_roll: JointPosition::LeftFootRoll,
                upper_leg: HumanBone::LeftUpperLeg,
                lower_leg: HumanBone::LeftLowerLeg,
                foot: HumanBone::LeftFoot,
            },
        }
    }
}

/// Hip, knee and ankle of one leg.
///
/// The hip is a yaw-roll-pitch gimbal, solved as intrinsic Y-Z-X Euler
/// angles.  Knee and ankle take the single-axis part of their bone in the
/// frame the joints above actually reached.
pub fn update_leg<S>(frame: &Frame<'_, S>, leg: LegJoints, bank: &mut ServoBank) -> RetargetResult<()>
where
    S: SkeletonSource + ?Sized,
{
    let rot = frame.lower_relative(leg.upper_leg)?;
    let (yaw, roll, pitch) = rot.to_euler(EulerRot::YZX);
    let inv = apply_direct_rotation(Quat::IDENTITY, to_degrees(yaw), leg.hip_yaw, bank);
    let inv = apply_direct_rotation(inv, to_degrees(roll), leg.hip_roll, bank);
    let inv = apply_direct_rotation(inv, to_degrees(pitch), leg.upper_leg_pitch, bank);

    let rot = inv * frame.lower_relative(leg.lower_leg)?;
    let inv = apply_partial_rotation_accumulated(rot, inv, leg.lower_leg_pitch, bank);

    let rot = inv * frame.lower_relative(leg.foot)?;
    let rot = apply_partial_rotation(rot, leg.foot_pitch, bank);
    apply_partial_rotation(rot, leg.foot_roll, bank);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationTable;
    use crate::decompose::to_radians;
    use crate::mechanism::{ActuatorTable, Mechanism, roid1_description};
    use crate::skeleton::PoseSnapshot;

    const EPS: f32 = 1e-3;

    fn roid1_bank() -> ServoBank {
        let calibration = CalibrationTable::roid1();
        let mut mechanism = Mechanism::from_description(&roid1_description());
        let actuators = ActuatorTable::resolve(&mut mechanism, &calibration);
        ServoBank::new(&calibration, actuators)
    }

    fn target(bank: &ServoBank, joint: JointPosition) -> f32 {
        bank.servo(joint).target()
    }

    #[test]
    fn shoulder_angles_point_the_arm() {
        let (pitch, roll) = shoulder_angles(Side::Right, Vec3::Z);
        assert!((pitch + 90.0).abs() < EPS);
        assert!((roll + 90.0).abs() < EPS);
        let (pitch, roll) = shoulder_angles(Side::Left, Vec3::Z);
        assert!((pitch - 90.0).abs() < EPS);
        assert!((roll - 90.0).abs() < EPS);
        // arm straight out: no roll
        let (_, roll) = shoulder_angles(Side::Right, Vec3::X);
        assert!(roll.abs() < EPS);
    }

    #[test]
    fn elbow_angles_of_a_straight_arm() {
        let (_, pitch) = elbow_angles(Side::Right, Vec3::X);
        assert!(pitch.abs() < EPS);
        let (yaw, pitch) = elbow_angles(Side::Left, Vec3::NEG_Z);
        assert!(yaw.abs() < EPS);
        assert!((pitch + 90.0).abs() < EPS);
    }

    #[test]
    fn head_turn_drives_inverted_yaw() {
        let rest_pose = PoseSnapshot::uniform(Quat::IDENTITY);
        let rest = RestPose::record(&rest_pose).unwrap();
        let pose = rest_pose.with_bone(HumanBone::Head, Quat::from_rotation_y(to_radians(30.0)));
        let mut bank = roid1_bank();
        update_head(&Frame::new(&pose, &rest).unwrap(), &mut bank).unwrap();
        assert!((target(&bank, JointPosition::HeadYaw) + 30.0).abs() < EPS);
    }

    #[test]
    fn chest_follows_upper_root() {
        let rest_pose = PoseSnapshot::uniform(Quat::IDENTITY);
        let rest = RestPose::record(&rest_pose).unwrap();
        let turn = Quat::from_rotation_y(to_radians(20.0));
        let pose = rest_pose.with_bone(HumanBone::Chest, turn);
        let mut bank = roid1_bank();
        update_chest(&Frame::new(&pose, &rest).unwrap(), &mut bank).unwrap();
        // c_chest is inverted
        assert!((target(&bank, JointPosition::ChestYaw) + 20.0).abs() < EPS);
    }

    #[test]
    fn straight_arm_holds_shoulder_pitch() {
        let pose = PoseSnapshot::uniform(Quat::IDENTITY);
        let rest = RestPose::record(&pose).unwrap();
        let mut bank = roid1_bank();
        bank.set_angle(JointPosition::RightShoulderPitch, 25.0);
        update_arm(&Frame::new(&pose, &rest).unwrap(), ArmJoints::of(Side::Right), 1.0, &mut bank).unwrap();
        assert!((bank.servo(JointPosition::RightShoulderPitch).angle() - 25.0).abs() < EPS);
        assert!((target(&bank, JointPosition::RightShoulderRoll) + 90.0).abs() < EPS);
    }

    #[test]
    fn knee_bend_keeps_foot_on_shin() {
        let rest_pose = PoseSnapshot::uniform(Quat::IDENTITY);
        let rest = RestPose::record(&rest_pose).unwrap();
        let bend = Quat::from_rotation_x(to_radians(40.0));
        let pose = rest_pose
            .with_bone(HumanBone::LeftLowerLeg, bend)
            .with_bone(HumanBone::LeftFoot, bend);
        let mut bank = roid1_bank();
        update_leg(&Frame::new(&pose, &rest).unwrap(), LegJoints::of(Side::Left), &mut bank).unwrap();
        assert!((target(&bank, JointPosition::LeftLowerLegPitch) - 40.0).abs() < EPS);
        assert!(target(&bank, JointPosition::LeftUpperLegPitch).abs() < EPS);
        assert!(target(&bank, JointPosition::LeftFootPitch).abs() < EPS);
        assert!(target(&bank, JointPosition::LeftFootRoll).abs() < EPS);
    }

    #[test]
    fn scaled_rotations_give_unit_angles() {
        let rest_pose = PoseSnapshot::uniform(Quat::IDENTITY);
        let rest = RestPose::record(&rest_pose).unwrap();
        let hip = Quat::from_rotation_x(0.5);
        let mut unit = roid1_bank();
        let mut scaled = roid1_bank();
        for (bank, scale) in [(&mut unit, 1.0), (&mut scaled, 1.2)] {
            let pose = PoseSnapshot::uniform(Quat::IDENTITY * scale)
                .with_bone(HumanBone::LeftUpperLeg, hip * scale)
                .with_bone(HumanBone::LeftLowerLeg, hip * scale)
                .with_bone(HumanBone::LeftFoot, hip * scale);
            update_leg(&Frame::new(&pose, &rest).unwrap(), LegJoints::of(Side::Left), bank).unwrap();
        }
        assert!((target(&unit, JointPosition::LeftUpperLegPitch) - 0.5f32.to_degrees()).abs() < EPS);
        for joint in JointPosition::LOWER_BODY {
            assert!(
                (target(&unit, joint) - target(&scaled, joint)).abs() < EPS,
                "{joint}: {} != {}",
                target(&unit, joint),
                target(&scaled, joint)
            );
        }
    }

    #[test]
    fn frame_checks_every_bone_up_front() {
        let rest_pose = PoseSnapshot::uniform(Quat::IDENTITY);
        let rest = RestPose::record(&rest_pose).unwrap();
        let mut pose = rest_pose.clone();
        pose.remove(HumanBone::LeftFoot);
        assert!(matches!(
            Frame::new(&pose, &rest),
            Err(crate::error::RetargetError::MissingBone(HumanBone::LeftFoot))
        ));
    }

    #[test]
    fn hip_gimbal_reproduces_upper_leg() {
        let rest_pose = PoseSnapshot::uniform(Quat::IDENTITY);
        let rest = RestPose::record(&rest_pose).unwrap();
        let hip = Quat::from_euler(
            EulerRot::YZX,
            to_radians(15.0),
            to_radians(-10.0),
            to_radians(35.0),
        );
        let pose = rest_pose
            .with_bone(HumanBone::RightUpperLeg, hip)
            .with_bone(HumanBone::RightLowerLeg, hip)
            .with_bone(HumanBone::RightFoot, hip);
        let mut bank = roid1_bank();
        update_leg(&Frame::new(&pose, &rest).unwrap(), LegJoints::of(Side::Right), &mut bank).unwrap();
        // hip yaw and roll are inverted on the roid1
        assert!((target(&bank, JointPosition::RightHipYaw) + 15.0).abs() < EPS);
        assert!((target(&bank, JointPosition::RightHipRoll) - 10.0).abs() < EPS);
        assert!((target(&bank, JointPosition::RightUpperLegPitch) - 35.0).abs() < EPS);
        assert!(target(&bank, JointPosition::RightLowerLegPitch).abs() < EPS);
    }
}
