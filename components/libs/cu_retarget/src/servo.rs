//! Servo driver: calibration, clamping and the tracked commanded angle.
//!
//! Angles handled by a [`Servo`] are in degrees and relative to the
//! source rest pose.  The actuator sees `angle + offset`, clamped to its
//! limits; the servo remembers the angle that was actually reached so the
//! chains can rebuild the achieved rotation from it.

use crate::calibration::{CalibrationTable, JointCalibration};
use crate::joint::{Axis, JOINT_COUNT, JointPosition};
use crate::mechanism::{Actuator, ActuatorTable};
use log::trace;

/// Runtime state of one joint.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Servo {
    pub calibration: JointCalibration,
    /// Last applied angle: pre-offset, post-clamp.
    angle: f32,
}

/// Clamp `value` into the interval spanned by `a` and `b`, in any order.
#[inline]
pub fn clamp_unordered(value: f32, a: f32, b: f32) -> f32 {
    value.clamp(a.min(b), a.max(b))
}

impl Servo {
    pub fn new(calibration: JointCalibration) -> Self {
        Self {
            calibration,
            angle: 0.0,
        }
    }

    /// Last applied angle in degrees.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn axis(&self) -> Axis {
        self.calibration.axis
    }

    /// `-1.0` for inverted joints, `1.0` otherwise.
    pub fn direction(&self) -> f32 {
        self.calibration.direction()
    }

    /// Target the actuator sees for the current angle.
    pub fn target(&self) -> f32 {
        self.angle + self.calibration.offset
    }

    /// Command `requested` degrees and return the angle actually applied.
    ///
    /// Without an actuator nothing limits the joint: the request is kept
    /// as is.
    pub fn set_angle(
        &mut self,
        requested: f32,
        actuator: Option<&mut (dyn Actuator + 'static)>,
    ) -> f32 {
        self.angle = requested;
        if let Some(actuator) = actuator {
            let offset = self.calibration.offset;
            let (lower, upper) = actuator.limits();
            let target = clamp_unordered(requested + offset, lower, upper);
            if target != requested + offset {
                trace!("clamped {requested} + {offset} to {target}");
            }
            self.angle = target - offset;
            actuator.set_target(target);
        }
        self.angle
    }
}

/// All servos of the mechanism, indexed by [`JointPosition`], together
/// with their actuators.
pub struct ServoBank {
    servos: [Servo; JOINT_COUNT],
    actuators: ActuatorTable,
}

impl ServoBank {
    /// Calibrate every joint against its bound actuator.
    pub fn new(calibration: &CalibrationTable, actuators: ActuatorTable) -> Self {
        let servos = JointPosition::ALL.map(|joint| {
            let anchor = actuators.get(joint).map(|a| a.anchor_euler());
            Servo::new(JointCalibration::bind(calibration.spec(joint), anchor))
        });
        Self { servos, actuators }
    }

    pub fn servo(&self, joint: JointPosition) -> &Servo {
        &self.servos[joint.index()]
    }

    pub fn actuators(&self) -> &ActuatorTable {
        &self.actuators
    }

    pub fn actuators_mut(&mut self) -> &mut ActuatorTable {
        &mut self.actuators
    }

    /// Command one joint.  See [`Servo::set_angle`].
    pub fn set_angle(&mut self, joint: JointPosition, requested: f32) -> f32 {
        let servo = &mut self.servos[joint.index()];
        servo.set_angle(requested, self.actuators.get_mut(joint))
    }

    /// `(joint, servo)` pairs in [`JointPosition::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (JointPosition, &Servo)> {
        JointPosition::ALL.into_iter().zip(self.servos.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mechanism::RevoluteDrive;

    fn servo(offset: f32, inverted: bool) -> Servo {
        Servo::new(JointCalibration {
            axis: Axis::X,
            inverted,
            offset,
        })
    }

    #[test]
    fn clamps_after_offset() {
        let mut s = servo(10.0, false);
        let mut drive = RevoluteDrive::new(-45.0, 45.0);
        assert_eq!(s.set_angle(60.0, Some(&mut drive)), 35.0);
        assert_eq!(drive.target, 45.0);
        assert_eq!(s.angle(), 35.0);
        assert_eq!(s.target(), 45.0);
    }

    #[test]
    fn reversed_limits_are_normalized() {
        let mut s = servo(10.0, false);
        let mut drive = RevoluteDrive::new(45.0, -45.0);
        assert_eq!(s.set_angle(60.0, Some(&mut drive)), 35.0);
        assert_eq!(s.set_angle(-100.0, Some(&mut drive)), -55.0);
        assert_eq!(drive.target, -45.0);
    }

    #[test]
    fn within_limits_passes_through() {
        let mut s = servo(-5.0, true);
        let mut drive = RevoluteDrive::new(-90.0, 90.0);
        assert_eq!(s.set_angle(20.0, Some(&mut drive)), 20.0);
        assert_eq!(drive.target, 15.0);
    }

    #[test]
    fn applied_angle_stays_in_limits() {
        let limits = [(-45.0, 45.0), (45.0, -45.0), (0.0, 120.0), (30.0, -10.0)];
        let offsets = [0.0, 10.0, -90.0];
        for &(lo, hi) in &limits {
            for &offset in &offsets {
                let mut s = servo(offset, false);
                let mut drive = RevoluteDrive::new(lo, hi);
                let mut requested = -400.0;
                while requested <= 400.0 {
                    let applied = s.set_angle(requested, Some(&mut drive));
                    let min = f32::min(lo, hi) - offset;
                    let max = f32::max(lo, hi) - offset;
                    assert!(
                        applied >= min - 1e-4 && applied <= max + 1e-4,
                        "{requested} -> {applied} outside [{min}, {max}]"
                    );
                    requested += 7.5;
                }
            }
        }
    }

    #[test]
    fn inert_servo_tracks_request() {
        let mut s = servo(10.0, false);
        assert_eq!(s.set_angle(500.0, None), 500.0);
        assert_eq!(s.angle(), 500.0);
    }

    #[test]
    fn bank_binds_axes_from_actuators() {
        let mut actuators = ActuatorTable::empty();
        actuators.insert(
            JointPosition::HeadYaw,
            Box::new(RevoluteDrive::about(Axis::Y, -90.0, 90.0)),
        );
        let mut bank = ServoBank::new(&CalibrationTable::roid1(), actuators);
        assert_eq!(bank.servo(JointPosition::HeadYaw).axis(), Axis::Y);
        assert_eq!(bank.servo(JointPosition::ChestYaw).axis(), Axis::X);
        assert_eq!(bank.set_angle(JointPosition::HeadYaw, 120.0), 90.0);
        assert_eq!(bank.set_angle(JointPosition::ChestYaw, 120.0), 120.0);
        let head = bank.actuators().get(JointPosition::HeadYaw).unwrap();
        assert_eq!(head.target(), 90.0);
    }
}
