//! Things the camera can follow.

use glam::Vec3;

use crate::physics::BodyHandle;

/// Capability exposed by a followable entity.
pub trait TargetProvider {
    /// Unit vector the target is facing.
    fn forward_direction(&self) -> Vec3;
    /// World position the camera should look at.
    fn target_point(&self) -> Vec3;
    /// Collision body of the target itself, never treated as an obstruction.
    fn collision_body(&self) -> BodyHandle;
}

/// Per-frame snapshot of a target.
///
/// The camera holds no reference to the target between frames; following a
/// different entity is just capturing a different snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetState {
    /// Point of interest in world coordinates.
    pub point: Vec3,
    /// Facing direction.
    pub forward: Vec3,
    /// Collision body of the target.
    pub body: BodyHandle,
}

impl TargetState {
    /// Snapshot a target provider.
    #[must_use]
    pub fn capture(target: &dyn TargetProvider) -> Self {
        Self {
            point: target.target_point(),
            forward: target.forward_direction(),
            body: target.collision_body(),
        }
    }
}

impl TargetProvider for TargetState {
    fn forward_direction(&self) -> Vec3 {
        self.forward
    }

    fn target_point(&self) -> Vec3 {
        self.point
    }

    fn collision_body(&self) -> BodyHandle {
        self.body
    }
}
