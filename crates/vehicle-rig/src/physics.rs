//! Physics-engine collaborator interfaces.
//!
//! The controllers never own a physics world. They read body state and
//! ray-cast results through these traits and write torque impulses back.

use glam::{Mat3, Quat, Vec3};

/// Opaque identity of a collision body.
///
/// Only used for equality, e.g. to keep a camera's own target from
/// obstructing its view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub u64);

/// World-space pose of a rigid body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyTransform {
    /// Center-of-mass position.
    pub position: Vec3,
    /// Body-to-world rotation.
    pub rotation: Quat,
}

impl BodyTransform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Create a transform from position and rotation.
    #[must_use]
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Transform a body-local point into world space.
    #[must_use]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }
}

impl Default for BodyTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Rigid body seen from a pre-step callback.
pub trait RigidBodyState {
    /// Current world transform.
    fn transform(&self) -> BodyTransform;
    /// Gravity acceleration acting on this body.
    fn gravity(&self) -> Vec3;
    /// Inverse inertia tensor in world coordinates.
    fn inverse_inertia_world(&self) -> Mat3;
    /// Apply an angular impulse (N·m·s) about the center of mass.
    fn apply_torque_impulse(&mut self, impulse: Vec3);
}

/// A single ray hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Position along the ray, 0 at the origin and 1 at the end point.
    pub fraction: f32,
    /// The body that was hit.
    pub body: BodyHandle,
    /// Surface normal at the hit point.
    pub normal: Vec3,
}

/// Ray casting against the physics world.
pub trait RayCastProvider {
    /// Cast a ray from `from` to `to` and return every hit along it.
    fn cast_ray(&self, from: Vec3, to: Vec3) -> Vec<RayHit>;
}

impl<F> RayCastProvider for F
where
    F: Fn(Vec3, Vec3) -> Vec<RayHit>,
{
    fn cast_ray(&self, from: Vec3, to: Vec3) -> Vec<RayHit> {
        self(from, to)
    }
}

/// Decides which bodies may block the camera's line of sight.
pub trait ObstructionFilter {
    /// Whether `body` counts as an obstruction.
    fn should_obstruct(&self, body: BodyHandle) -> bool;
}

impl<F> ObstructionFilter for F
where
    F: Fn(BodyHandle) -> bool,
{
    fn should_obstruct(&self, body: BodyHandle) -> bool {
        self(body)
    }
}

/// Filter under which every body is solid.
#[derive(Clone, Copy, Debug, Default)]
pub struct ObstructAll;

impl ObstructionFilter for ObstructAll {
    fn should_obstruct(&self, _body: BodyHandle) -> bool {
        true
    }
}
