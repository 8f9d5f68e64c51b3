//! The retargeting engine: rest pose, servos and per-frame update.

use crate::calibration::CalibrationTable;
use crate::chain::{
    ArmJoints, Frame, LegJoints, update_arm, update_chest, update_head, update_leg,
};
use crate::config::RetargetConfig;
use crate::error::{RetargetError, RetargetResult};
use crate::joint::{JointPosition, ServosMask, Side};
use crate::mechanism::{ActuatorTable, Mechanism};
use crate::messages::JointTargets;
use crate::rest_pose::RestPose;
use crate::servo::{Servo, ServoBank};
use crate::skeleton::SkeletonSource;
use log::{debug, info};

/// Drives the servos of a mechanism from a source skeleton.
///
/// Typical use: build the engine once the mechanism is known, call
/// [`record_rest_pose`](Self::record_rest_pose) while the skeleton stands
/// in its T-pose, then [`update`](Self::update) once per frame.
pub struct RetargetEngine {
    bank: ServoBank,
    rest: Option<RestPose>,
    config: RetargetConfig,
}

impl RetargetEngine {
    pub fn new(calibration: &CalibrationTable, actuators: ActuatorTable) -> Self {
        info!(
            "retargeting onto {} bound actuators",
            actuators.bound_count()
        );
        Self {
            bank: ServoBank::new(calibration, actuators),
            rest: None,
            config: RetargetConfig::default(),
        }
    }

    /// Bind `calibration` against the actuators of `mechanism`.
    ///
    /// Bound actuators are moved out of the mechanism into the engine.
    pub fn from_mechanism(calibration: &CalibrationTable, mechanism: &mut Mechanism) -> Self {
        let actuators = ActuatorTable::resolve(mechanism, calibration);
        Self::new(calibration, actuators)
    }

    pub fn with_config(mut self, config: RetargetConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RetargetConfig {
        &self.config
    }

    pub fn set_mask(&mut self, mask: ServosMask) {
        self.config.mask = mask;
    }

    pub fn mask(&self) -> ServosMask {
        self.config.mask
    }

    /// Capture the skeleton's current pose as the rest pose.
    ///
    /// Replaces any previous rest pose.  On failure the previous one is
    /// kept.
    pub fn record_rest_pose<S>(&mut self, skeleton: &S) -> RetargetResult<()>
    where
        S: SkeletonSource + ?Sized,
    {
        self.rest = Some(RestPose::record(skeleton)?);
        Ok(())
    }

    pub fn rest_pose(&self) -> Option<&RestPose> {
        self.rest.as_ref()
    }

    /// Retarget one frame of the skeleton onto the servos.
    ///
    /// Chains run in a fixed order: chest, head, right arm, left arm,
    /// right leg, left leg.  Masked regions keep their previous angles.
    ///
    /// Every bone is looked up before the first servo moves, so a frame
    /// that fails leaves all servos where they were.
    pub fn update<S>(&mut self, skeleton: &S) -> RetargetResult<()>
    where
        S: SkeletonSource + ?Sized,
    {
        let rest = self.rest.as_ref().ok_or(RetargetError::RestPoseNotRecorded)?;
        let frame = Frame::new(skeleton, rest)?;
        let mask = self.config.mask;
        let bank = &mut self.bank;

        if !mask.contains(ServosMask::UPPER_BODY) {
            let threshold = self.config.singularity_threshold_deg;
            update_chest(&frame, bank)?;
            update_head(&frame, bank)?;
            update_arm(&frame, ArmJoints::of(Side::Right), threshold, bank)?;
            update_arm(&frame, ArmJoints::of(Side::Left), threshold, bank)?;
        }
        if !mask.contains(ServosMask::LOWER_BODY) {
            update_leg(&frame, LegJoints::of(Side::Right), bank)?;
            update_leg(&frame, LegJoints::of(Side::Left), bank)?;
        }

        if log::log_enabled!(log::Level::Debug) {
            for (joint, servo) in self.bank.iter() {
                debug!("{joint}: {:.2} (target {:.2})", servo.angle(), servo.target());
            }
        }
        Ok(())
    }

    pub fn servo(&self, joint: JointPosition) -> &Servo {
        self.bank.servo(joint)
    }

    /// Last applied angle of `joint`, relative to the rest pose.
    pub fn angle(&self, joint: JointPosition) -> f32 {
        self.bank.servo(joint).angle()
    }

    pub fn servos(&self) -> impl Iterator<Item = (JointPosition, &Servo)> {
        self.bank.iter()
    }

    pub fn actuators(&self) -> &ActuatorTable {
        self.bank.actuators()
    }

    pub fn actuators_mut(&mut self) -> &mut ActuatorTable {
        self.bank.actuators_mut()
    }

    /// Actuator-side target of every joint, as a Copper payload.
    pub fn targets(&self) -> JointTargets {
        let mut targets = JointTargets::new();
        targets.fill_from_iter(self.bank.iter().map(|(_, servo)| servo.target()));
        targets
    }
}
