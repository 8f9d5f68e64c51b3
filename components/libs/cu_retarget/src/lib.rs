//! Humanoid skeleton to servo retargeting.
//!
//! Reads the world bone rotations of a humanoid skeleton every frame and
//! turns them into angles for a mechanism built from single-axis revolute
//! servos, such as a hobby humanoid robot:
//!
//! - [`calibration`]: per-joint direction and offset, with JSON files.
//! - [`mechanism`]: the target node tree and its [`Actuator`]s.
//! - [`rest_pose`]: the reference T-pose every frame is compared to.
//! - [`decompose`]: splitting rotations onto single axes.
//! - [`chain`]: head, chest, arm and leg solvers.
//! - [`engine`]: [`RetargetEngine`], tying it all together.
//!
//! ```no_run
//! use cu_retarget::{CalibrationTable, Mechanism, PoseSnapshot, RetargetEngine};
//! use std::path::Path;
//!
//! # fn main() -> cu_retarget::RetargetResult<()> {
//! let mut mechanism = Mechanism::load(Path::new("roid1.json"))?;
//! let mut engine = RetargetEngine::from_mechanism(&CalibrationTable::roid1(), &mut mechanism);
//! let frames = PoseSnapshot::load_sequence(Path::new("poses.json"))?;
//! engine.record_rest_pose(&frames[0])?;
//! for frame in &frames[1..] {
//!     engine.update(frame)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod calibration;
pub mod chain;
pub mod config;
pub mod decompose;
pub mod engine;
pub mod error;
pub mod joint;
pub mod mechanism;
pub mod messages;
pub mod rest_pose;
pub mod servo;
pub mod skeleton;

pub use calibration::{CalibrationTable, JointCalibration, JointSpec};
pub use config::RetargetConfig;
pub use engine::RetargetEngine;
pub use error::{RetargetError, RetargetResult};
pub use joint::{Axis, JOINT_COUNT, JointPosition, ServosMask, Side};
pub use mechanism::{Actuator, ActuatorTable, Mechanism, NodeDescription, RevoluteDrive};
pub use messages::JointTargets;
pub use rest_pose::RestPose;
pub use servo::{Servo, ServoBank};
pub use skeleton::{HumanBone, PoseSnapshot, SkeletonSource};
