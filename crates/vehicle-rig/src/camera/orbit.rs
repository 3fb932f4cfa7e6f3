//! Orbit geometry.
//!
//! Pure functions on offsets and look directions, usable without a
//! [`ChaseCamera`](super::ChaseCamera).

use glam::{Mat3, Quat, Vec2, Vec3};

use crate::WORLD_UP;

/// Horizontal components shorter than this have no usable bearing.
const MIN_HORIZONTAL_LENGTH_SQ: f32 = 1e-12;

/// Camera `(left, up)` axes for a unit look direction.
///
/// Left is horizontal. When looking straight along world up, an arbitrary
/// horizontal left axis is chosen.
#[must_use]
pub fn camera_axes(look: Vec3) -> (Vec3, Vec3) {
    let left = WORLD_UP
        .cross(look)
        .try_normalize()
        .unwrap_or_else(|| look.any_orthonormal_vector());
    let up = look.cross(left);
    (left, up)
}

/// Rotate `rotated` back to the length of `original`.
fn preserve_length(original: Vec3, rotated: Vec3) -> Vec3 {
    rotated.normalize_or(original.normalize_or_zero()) * original.length()
}

/// Apply discrete orbit signals to an offset.
///
/// `up_sign` and `cw_sign` are -1, 0 or 1. `step` is the angle for a single
/// active signal; diagonal input is normalized so it moves at the same angular
/// speed. With no active signal the offset is returned untouched.
#[must_use]
pub fn orbit_discrete(offset: Vec3, up_sign: i8, cw_sign: i8, step: f32) -> Vec3 {
    if up_sign == 0 && cw_sign == 0 {
        return offset;
    }
    let up_sign = f32::from(up_sign);
    let cw_sign = f32::from(cw_sign);
    let root_sum_squares = up_sign.hypot(cw_sign);

    let (left, up) = camera_axes(-offset.normalize());
    let pitch = step * up_sign / root_sum_squares;
    // Clockwise seen from above is a negative turn about +Y.
    let yaw = -step * cw_sign / root_sum_squares;
    let rotation = Quat::from_axis_angle(up, yaw) * Quat::from_axis_angle(left, pitch);

    preserve_length(offset, rotation * offset)
}

/// Apply analog pitch and yaw (radians) to an offset.
///
/// Pitch turns about the camera's left axis, yaw about world up.
#[must_use]
pub fn orbit_analog(offset: Vec3, pitch: f32, yaw: f32) -> Vec3 {
    if pitch == 0.0 && yaw == 0.0 {
        return offset;
    }
    let (left, _) = camera_axes(-offset.normalize());
    let rotation = Quat::from_axis_angle(WORLD_UP, yaw) * Quat::from_axis_angle(left, pitch);
    preserve_length(offset, rotation * offset)
}

/// Keep a unit look direction at least `min_angle` away from world up and down.
///
/// Directions inside the cone are moved onto its boundary, keeping their
/// horizontal bearing. A direction exactly along up gets an arbitrary bearing.
#[must_use]
pub fn avoid_up_singularity(look: Vec3, min_angle: f32) -> Vec3 {
    let max_abs_dot = min_angle.cos();
    let dot = look.dot(WORLD_UP);
    if dot.abs() <= max_abs_dot {
        return look;
    }

    // Gram-Schmidt: remove the up component.
    let horizontal = (look - WORLD_UP * dot)
        .try_normalize()
        .unwrap_or_else(|| WORLD_UP.any_orthonormal_vector());
    let vertical = max_abs_dot.copysign(dot);
    (horizontal * min_angle.sin() + WORLD_UP * vertical).normalize()
}

/// Horizontal bearing of a direction, measured from +Z toward +X.
#[must_use]
pub fn bearing(direction: Vec3) -> f32 {
    direction.x.atan2(direction.z)
}

/// Turn `look` about world up so its bearing matches `forward`.
///
/// Returns `None` when `forward` has no usable horizontal bearing.
#[must_use]
pub fn align_to_forward(look: Vec3, forward: Vec3) -> Option<Vec3> {
    if Vec2::new(forward.x, forward.z).length_squared() < MIN_HORIZONTAL_LENGTH_SQ {
        return None;
    }
    let angle = bearing(forward) - bearing(look);
    if !angle.is_finite() {
        return None;
    }
    Some(Quat::from_rotation_y(angle) * look)
}

/// Rotation of a camera looking along `look` with world up.
///
/// The camera's local `-Z` maps to `look` and local `+Y` stays in the
/// vertical plane containing `look`.
#[must_use]
pub fn look_rotation(look: Vec3) -> Quat {
    let right = look
        .cross(WORLD_UP)
        .try_normalize()
        .unwrap_or_else(|| look.any_orthonormal_vector());
    let up = right.cross(look);
    Quat::from_mat3(&Mat3::from_cols(right, up, -look)).normalize()
}
