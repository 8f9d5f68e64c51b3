//! Message types for publishing retargeted servo targets.

use crate::joint::JOINT_COUNT;
use cu29::prelude::*;

/// One slot per [`crate::JointPosition`].
pub const MAX_JOINTS: usize = JOINT_COUNT;

/// Actuator-side targets in degrees, in [`crate::JointPosition::ALL`]
/// order.  Inert joints carry the angle they would have been given.
pub type JointTargets = CuArray<f32, MAX_JOINTS>;
