//! Line-of-sight test between the target and the camera.

use glam::Vec3;

use crate::{
    physics::{BodyHandle, ObstructionFilter, RayCastProvider, RayHit},
    target::TargetState,
};

/// Smallest hit fraction among bodies that count as obstructions.
///
/// The target's own body and bodies rejected by `filter` are ignored.
#[must_use]
pub fn nearest_obstruction(
    hits: &[RayHit],
    target_body: BodyHandle,
    filter: &dyn ObstructionFilter,
) -> Option<f32> {
    hits.iter()
        .filter(|hit| hit.body != target_body && filter.should_obstruct(hit.body))
        .map(|hit| hit.fraction.clamp(0.0, 1.0))
        .min_by(f32::total_cmp)
}

/// Longest unobstructed range along `-look` from the target, up to `ray_range`.
pub fn line_of_sight_range(
    world: &dyn RayCastProvider,
    filter: &dyn ObstructionFilter,
    target: &TargetState,
    look: Vec3,
    ray_range: f32,
) -> f32 {
    let camera_location = target.point - look * ray_range;
    let hits = world.cast_ray(target.point, camera_location);
    match nearest_obstruction(&hits, target.body, filter) {
        Some(fraction) => {
            tracing::trace!(
                "Line of sight obstructed at {:.3} of {:.2} m",
                fraction,
                ray_range
            );
            ray_range * fraction
        }
        None => ray_range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::ObstructAll;

    fn hit(fraction: f32, body: u64) -> RayHit {
        RayHit {
            fraction,
            body: BodyHandle(body),
            normal: Vec3::Y,
        }
    }

    #[test]
    fn test_nearest_obstruction_picks_minimum() {
        let hits = [hit(0.8, 2), hit(0.3, 3), hit(0.6, 4)];
        assert_eq!(
            nearest_obstruction(&hits, BodyHandle(1), &ObstructAll),
            Some(0.3)
        );
    }

    #[test]
    fn test_nearest_obstruction_ignores_target() {
        let hits = [hit(0.1, 1), hit(0.7, 2)];
        assert_eq!(
            nearest_obstruction(&hits, BodyHandle(1), &ObstructAll),
            Some(0.7)
        );
    }

    #[test]
    fn test_nearest_obstruction_applies_filter() {
        let hits = [hit(0.2, 5), hit(0.9, 2)];
        let not_debug = |body: BodyHandle| body != BodyHandle(5);
        assert_eq!(
            nearest_obstruction(&hits, BodyHandle(1), &not_debug),
            Some(0.9)
        );
        assert_eq!(nearest_obstruction(&[], BodyHandle(1), &not_debug), None);
    }

    #[test]
    fn test_line_of_sight_range() {
        let target = TargetState {
            point: Vec3::new(0.0, 1.0, 0.0),
            forward: Vec3::Z,
            body: BodyHandle(1),
        };
        let world = |from: Vec3, to: Vec3| {
            assert_eq!(from, Vec3::new(0.0, 1.0, 0.0));
            assert!((to - Vec3::new(0.0, 1.0, -10.0)).length() < 1e-5);
            vec![hit(0.25, 9)]
        };
        let range = line_of_sight_range(&world, &ObstructAll, &target, Vec3::Z, 10.0);
        assert!((range - 2.5).abs() < 1e-5);
    }
}
