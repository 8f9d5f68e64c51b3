//! Joint identities for the target mechanism.
//!
//! Every servo of the mechanism is named by a [`JointPosition`].  The
//! enumeration doubles as an arena index so servos and actuators can be
//! stored in flat arrays instead of maps.

use crate::decompose::to_degrees;
use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rotation axis of a single-DOF revolute joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Axis {
    /// Pitch.
    #[default]
    X,
    /// Yaw.
    Y,
    /// Roll.
    Z,
}

/// Anchor Euler component (degrees) above which a joint is considered
/// turned onto another axis.
const AXIS_TURN_THRESHOLD_DEG: f32 = 80.0;

impl Axis {
    /// Unit vector of this axis.
    pub fn unit(self) -> Vec3 {
        match self {
            Self::X => Vec3::X,
            Self::Y => Vec3::Y,
            Self::Z => Vec3::Z,
        }
    }

    /// Classify a joint axis from the Euler angles (degrees, XYZ order)
    /// of its anchor rotation.
    ///
    /// A joint anchored with a quarter turn about Z spins about Y (yaw),
    /// one anchored with a quarter turn about Y spins about Z (roll).
    /// Anything else is a pitch joint.
    pub fn from_anchor_euler(euler_deg: Vec3) -> Self {
        if euler_deg.z.abs() > AXIS_TURN_THRESHOLD_DEG {
            Self::Y
        } else if euler_deg.y.abs() > AXIS_TURN_THRESHOLD_DEG {
            Self::Z
        } else {
            Self::X
        }
    }

    /// Classify a joint axis directly from its anchor rotation.
    pub fn from_anchor_rotation(anchor: Quat) -> Self {
        let (x, y, z) = anchor.to_euler(EulerRot::XYZ);
        Self::from_anchor_euler(Vec3::new(to_degrees(x), to_degrees(y), to_degrees(z)))
    }
}

/// Body side of a mirrored chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Mounting position of one servo on the reference humanoid mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JointPosition {
    /// Whole-body reference.  Bound like the others but never driven.
    Spine,

    HeadYaw,

    LeftShoulderPitch,
    LeftShoulderRoll,
    LeftElbowYaw,
    LeftLowerArmPitch,

    LeftHipYaw,
    LeftHipRoll,
    LeftUpperLegPitch,
    LeftLowerLegPitch,
    LeftFootPitch,
    LeftFootRoll,

    ChestYaw,

    RightShoulderPitch,
    RightShoulderRoll,
    RightElbowYaw,
    RightLowerArmPitch,

    RightHipYaw,
    RightHipRoll,
    RightUpperLegPitch,
    RightLowerLegPitch,
    RightFootPitch,
    RightFootRoll,
}

/// Number of [`JointPosition`] variants.
pub const JOINT_COUNT: usize = 23;

impl JointPosition {
    /// Every joint, in declaration order (the order of [`Self::index`]).
    pub const ALL: [JointPosition; JOINT_COUNT] = [
        Self::Spine,
        Self::HeadYaw,
        Self::LeftShoulderPitch,
        Self::LeftShoulderRoll,
        Self::LeftElbowYaw,
        Self::LeftLowerArmPitch,
        Self::LeftHipYaw,
        Self::LeftHipRoll,
        Self::LeftUpperLegPitch,
        Self::LeftLowerLegPitch,
        Self::LeftFootPitch,
        Self::LeftFootRoll,
        Self::ChestYaw,
        Self::RightShoulderPitch,
        Self::RightShoulderRoll,
        Self::RightElbowYaw,
        Self::RightLowerArmPitch,
        Self::RightHipYaw,
        Self::RightHipRoll,
        Self::RightUpperLegPitch,
        Self::RightLowerLegPitch,
        Self::RightFootPitch,
        Self::RightFootRoll,
    ];

    /// Joints driven by the upper-body chains.
    pub const UPPER_BODY: [JointPosition; 10] = [
        Self::HeadYaw,
        Self::ChestYaw,
        Self::RightShoulderPitch,
        Self::RightShoulderRoll,
        Self::RightElbowYaw,
        Self::RightLowerArmPitch,
        Self::LeftShoulderPitch,
        Self::LeftShoulderRoll,
        Self::LeftElbowYaw,
        Self::LeftLowerArmPitch,
    ];

    /// Joints driven by the leg chains.
    pub const LOWER_BODY: [JointPosition; 12] = [
        Self::RightHipYaw,
        Self::RightHipRoll,
        Self::RightUpperLegPitch,
        Self::RightLowerLegPitch,
        Self::RightFootPitch,
        Self::RightFootRoll,
        Self::LeftHipYaw,
        Self::LeftHipRoll,
        Self::LeftUpperLegPitch,
        Self::LeftLowerLegPitch,
        Self::LeftFootPitch,
        Self::LeftFootRoll,
    ];

    /// Arena index of this joint.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Parse the variant name used in calibration files.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|j| j.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Spine => "Spine",
            Self::HeadYaw => "HeadYaw",
            Self::LeftShoulderPitch => "LeftShoulderPitch",
            Self::LeftShoulderRoll => "LeftShoulderRoll",
            Self::LeftElbowYaw => "LeftElbowYaw",
            Self::LeftLowerArmPitch => "LeftLowerArmPitch",
            Self::LeftHipYaw => "LeftHipYaw",
            Self::LeftHipRoll => "LeftHipRoll",
            Self::LeftUpperLegPitch => "LeftUpperLegPitch",
            Self::LeftLowerLegPitch => "LeftLowerLegPitch",
            Self::LeftFootPitch => "LeftFootPitch",
            Self::LeftFootRoll => "LeftFootRoll",
            Self::ChestYaw => "ChestYaw",
            Self::RightShoulderPitch => "RightShoulderPitch",
            Self::RightShoulderRoll => "RightShoulderRoll",
            Self::RightElbowYaw => "RightElbowYaw",
            Self::RightLowerArmPitch => "RightLowerArmPitch",
            Self::RightHipYaw => "RightHipYaw",
            Self::RightHipRoll => "RightHipRoll",
            Self::RightUpperLegPitch => "RightUpperLegPitch",
            Self::RightLowerLegPitch => "RightLowerLegPitch",
            Self::RightFootPitch => "RightFootPitch",
            Self::RightFootRoll => "RightFootRoll",
        }
    }
}

impl fmt::Display for JointPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags::bitflags! {
    /// Body regions excluded from retargeting.
    ///
    /// Stored as its raw bits in config files.  Flags combine with `|`:
    ///
    /// ```
    /// use cu_retarget::ServosMask;
    /// let mask = ServosMask::UPPER_BODY | ServosMask::LOWER_BODY;
    /// assert!(mask.contains(ServosMask::LOWER_BODY));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(from = "u8", into = "u8")]
    pub struct ServosMask: u8 {
        /// Head, chest and arms.
        const UPPER_BODY = 0b01;
        /// Both legs.
        const LOWER_BODY = 0b10;
    }
}

impl From<u8> for ServosMask {
    fn from(bits: u8) -> Self {
        Self::from_bits_truncate(bits)
    }
}

impl From<ServosMask> for u8 {
    fn from(mask: ServosMask) -> Self {
        mask.bits()
    }
}
