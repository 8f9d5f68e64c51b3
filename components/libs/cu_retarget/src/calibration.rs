//! Calibration data for the mechanism's servos.
//!
//! Each joint has the name of the mechanism node carrying its actuator,
//! a direction flag and an offset.  The offset is the angle (degrees)
//! between the servo's zero and the source skeleton's rest pose, so the
//! servo target is always `angle + offset`.
//!
//! The axis is not stored here: it is read from the actuator's anchor
//! rotation when the joint is bound (see [`JointCalibration::bind`]).

use crate::error::{RetargetError, RetargetResult};
use crate::joint::{Axis, JointPosition, JOINT_COUNT};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Static description of one joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSpec {
    /// Mechanism node holding the actuator.
    pub name: String,
    /// The servo turns opposite to the source rotation.
    #[serde(default)]
    pub inverted: bool,
    /// Servo angle at the source rest pose, in degrees.
    #[serde(default)]
    pub offset: f32,
}

impl JointSpec {
    pub fn new(name: &str, inverted: bool, offset: f32) -> Self {
        Self {
            name: name.to_string(),
            inverted,
            offset,
        }
    }
}

/// Resolved calibration of one joint.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointCalibration {
    pub axis: Axis,
    pub inverted: bool,
    pub offset: f32,
}

impl JointCalibration {
    /// Resolve a spec against the actuator's anchor Euler angles
    /// (degrees), if any.
    ///
    /// Joints without an actuator keep the pitch axis.
    pub fn bind(spec: &JointSpec, anchor_euler: Option<Vec3>) -> Self {
        Self {
            axis: anchor_euler.map(Axis::from_anchor_euler).unwrap_or_default(),
            inverted: spec.inverted,
            offset: spec.offset,
        }
    }

    /// `-1.0` for inverted joints, `1.0` otherwise.
    #[inline]
    pub fn direction(&self) -> f32 {
        if self.inverted { -1.0 } else { 1.0 }
    }
}

/// Calibration for every joint of the mechanism.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    specs: [JointSpec; JOINT_COUNT],
}

/// On-disk form: joint name -> spec.
#[derive(Serialize, Deserialize)]
struct CalibrationFile {
    joints: BTreeMap<String, JointSpec>,
}

impl CalibrationTable {
    /// Build a table from one spec per joint.
    ///
    /// Fails if any joint is missing.  Later duplicates win.
    pub fn from_specs<I>(specs: I) -> RetargetResult<Self>
    where
        I: IntoIterator<Item = (JointPosition, JointSpec)>,
    {
        let mut slots: [Option<JointSpec>; JOINT_COUNT] = Default::default();
        for (joint, spec) in specs {
            slots[joint.index()] = Some(spec);
        }
        let mut specs = Vec::with_capacity(JOINT_COUNT);
        for (joint, slot) in JointPosition::ALL.into_iter().zip(slots) {
            specs.push(slot.ok_or(RetargetError::MissingCalibration(joint))?);
        }
        let specs: [JointSpec; JOINT_COUNT] = specs
            .try_into()
            .map_err(|_| RetargetError::MissingCalibration(JointPosition::Spine))?;
        Ok(Self { specs })
    }

    /// Calibration of the Roid1 humanoid.
    ///
    /// The robot's rest pose is a T-pose with both arms lowered by 90°,
    /// hence the shoulder roll offsets.
    pub fn roid1() -> Self {
        use JointPosition::*;
        let entries = [
            (Spine, "c_waist", false, 0.0),
            (HeadYaw, "c_head", true, 0.0),
            (LeftShoulderPitch, "l_shoulder", false, 0.0),
            (LeftShoulderRoll, "l_upperarm", true, 90.0),
            (LeftElbowYaw, "l_elbow", false, 0.0),
            (LeftLowerArmPitch, "l_lowerarm", false, 0.0),
            (LeftHipYaw, "l_hipjointupper", true, 0.0),
            (LeftHipRoll, "l_hipjointlower", true, 0.0),
            (LeftUpperLegPitch, "l_upperleg", false, 0.0),
            (LeftLowerLegPitch, "l_lowerleg", false, 0.0),
            (LeftFootPitch, "l_ankle", false, 0.0),
            (LeftFootRoll, "l_foot", true, 0.0),
            (ChestYaw, "c_chest", true, 0.0),
            (RightShoulderPitch, "r_shoulder", false, 0.0),
            (RightShoulderRoll, "r_upperarm", true, -90.0),
            (RightElbowYaw, "r_elbow", false, 0.0),
            (RightLowerArmPitch, "r_lowerarm", false, 0.0),
            (RightHipYaw, "r_hipjointupper", true, 0.0),
            (RightHipRoll, "r_hipjointlower", true, 0.0),
            (RightUpperLegPitch, "r_upperleg", false, 0.0),
            (RightLowerLegPitch, "r_lowerleg", false, 0.0),
            (RightFootPitch, "r_ankle", false, 0.0),
            (RightFootRoll, "r_foot", true, 0.0),
        ];
        Self {
            specs: entries.map(|(_, name, inverted, offset)| JointSpec::new(name, inverted, offset)),
        }
    }

    pub fn spec(&self, joint: JointPosition) -> &JointSpec {
        &self.specs[joint.index()]
    }

    /// Replace the spec of one joint.
    pub fn set_spec(&mut self, joint: JointPosition, spec: JointSpec) {
        self.specs[joint.index()] = spec;
    }

    /// `(joint, spec)` pairs in [`JointPosition::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (JointPosition, &JointSpec)> {
        JointPosition::ALL.into_iter().zip(self.specs.iter())
    }

    pub fn load(path: &Path) -> RetargetResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> RetargetResult<Self> {
        let file: CalibrationFile = serde_json::from_str(json)?;
        let mut specs = Vec::with_capacity(file.joints.len());
        for (name, spec) in file.joints {
            let joint = JointPosition::from_name(&name).ok_or(RetargetError::UnknownJoint(name))?;
            specs.push((joint, spec));
        }
        Self::from_specs(specs)
    }

    pub fn save(&self, path: &Path) -> RetargetResult<()> {
        let file = CalibrationFile {
            joints: self
                .iter()
                .map(|(joint, spec)| (joint.name().to_string(), spec.clone()))
                .collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self::roid1()
    }
}
