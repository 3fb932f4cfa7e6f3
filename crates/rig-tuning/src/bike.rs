//! Inverted-pendulum motorcycle.
//!
//! The bike is a rigid body pivoting about its ground-contact point. The
//! contact point follows a prescribed path at constant speed and yaw rate,
//! so the only free degree of freedom is roll. Gravity and the contact
//! point's centripetal acceleration tip the body; the stabilizer's torque
//! impulses push it back.
//!
//! Roll is about the body's forward axis, using the same sign as
//! `Quat::from_rotation_z`: positive roll tilts the up axis toward the
//! bike's right.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat3, Quat, Vec3};
use vehicle_rig::{BodyTransform, RigidBodyState};

/// Physical parameters of the pendulum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BikeParams {
    /// Mass in kilograms.
    pub mass: f32,
    /// Height of the center of mass above the contact point.
    pub com_height: f32,
    /// Principal moments of inertia about the center of mass, in body axes
    /// (pitch about X, yaw about Y, roll about Z).
    pub inertia: Vec3,
    /// Viscous roll damping in 1/s.
    pub roll_damping: f32,
    /// Gravitational acceleration magnitude.
    pub gravity: f32,
}

impl Default for BikeParams {
    fn default() -> Self {
        Self {
            mass: 200.0,
            com_height: 0.55,
            inertia: Vec3::new(40.0, 30.0, 20.0),
            roll_damping: 0.5,
            gravity: 9.81,
        }
    }
}

impl BikeParams {
    /// Put the contact point at a body-local support offset below the
    /// center of mass. Offsets that are not below are ignored.
    #[must_use]
    pub fn pivoting_on(self, support_offset: Vec3) -> Self {
        let depth = -support_offset.y;
        if depth > 0.0 {
            Self {
                com_height: depth,
                ..self
            }
        } else {
            self
        }
    }

    /// Roll inertia about the contact point.
    #[must_use]
    pub fn contact_roll_inertia(&self) -> f32 {
        self.inertia.z + self.mass * self.com_height * self.com_height
    }
}

/// Roll angle at which the bike is considered down.
const FALLEN_ROLL: f32 = FRAC_PI_2 - 0.05;

/// A motorcycle riding a circular (or straight) path.
#[derive(Clone, Debug)]
pub struct BikeBody {
    params: BikeParams,
    contact: Vec3,
    heading: f32,
    roll: f32,
    roll_rate: f32,
    speed: f32,
    yaw_rate: f32,
    fallen: bool,
}

impl BikeBody {
    /// Upright bike at `contact`, facing `heading` radians from +Z toward +X.
    #[must_use]
    pub fn new(params: BikeParams, contact: Vec3, heading: f32) -> Self {
        Self {
            params,
            contact,
            heading,
            roll: 0.0,
            roll_rate: 0.0,
            speed: 0.0,
            yaw_rate: 0.0,
            fallen: false,
        }
    }

    /// Set the ground speed and yaw rate of the contact point.
    pub fn set_motion(&mut self, speed: f32, yaw_rate: f32) {
        self.speed = speed;
        self.yaw_rate = yaw_rate;
    }

    pub fn set_roll(&mut self, roll: f32) {
        self.roll = roll;
    }

    #[must_use]
    pub fn params(&self) -> &BikeParams {
        &self.params
    }

    #[must_use]
    pub fn contact(&self) -> Vec3 {
        self.contact
    }

    #[must_use]
    pub fn heading(&self) -> f32 {
        self.heading
    }

    #[must_use]
    pub fn roll(&self) -> f32 {
        self.roll
    }

    #[must_use]
    pub fn roll_rate(&self) -> f32 {
        self.roll_rate
    }

    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    #[must_use]
    pub fn yaw_rate(&self) -> f32 {
        self.yaw_rate
    }

    #[must_use]
    pub fn is_fallen(&self) -> bool {
        self.fallen
    }

    #[must_use]
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.heading) * Quat::from_rotation_z(self.roll)
    }

    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::Z
    }

    fn heading_rotation(&self) -> Quat {
        Quat::from_rotation_y(self.heading)
    }

    /// Acceleration of the contact point along the path.
    #[must_use]
    pub fn contact_acceleration(&self) -> Vec3 {
        self.heading_rotation() * Vec3::X * (self.speed * self.yaw_rate)
    }

    /// Roll at which gravity and cornering balance.
    #[must_use]
    pub fn balanced_lean(&self) -> f32 {
        -(self.speed * self.yaw_rate / self.params.gravity).atan()
    }

    /// Move the bike without changing its roll state.
    pub fn teleport(&mut self, contact: Vec3, heading: f32) {
        self.contact = contact;
        self.heading = heading;
    }

    /// Add an angular impulse about the roll axis, in N·m·s.
    pub fn disturb(&mut self, roll_impulse: f32) {
        if !self.fallen {
            self.roll_rate += roll_impulse / self.params.contact_roll_inertia();
        }
    }

    /// Integrate one step with semi-implicit Euler.
    pub fn step(&mut self, dt: f32) {
        if self.fallen {
            return;
        }

        let forward = self.forward();
        let lever = self.rotation() * Vec3::new(0.0, self.params.com_height, 0.0);
        let specific_force = self.gravity() - self.contact_acceleration();
        let torque = lever.cross(specific_force * self.params.mass).dot(forward);
        let roll_acceleration =
            torque / self.params.contact_roll_inertia() - self.params.roll_damping * self.roll_rate;

        self.roll_rate += roll_acceleration * dt;
        self.roll += self.roll_rate * dt;
        self.contact += self.heading_rotation() * Vec3::Z * (self.speed * dt);
        self.heading += self.yaw_rate * dt;

        if self.roll.abs() >= FALLEN_ROLL {
            tracing::debug!("Bike fell at roll {:.1} degrees", self.roll.to_degrees());
            self.roll = self.roll.clamp(-FALLEN_ROLL, FALLEN_ROLL);
            self.roll_rate = 0.0;
            self.speed = 0.0;
            self.yaw_rate = 0.0;
            self.fallen = true;
        }
    }
}

impl RigidBodyState for BikeBody {
    fn transform(&self) -> BodyTransform {
        let rotation = self.rotation();
        BodyTransform::new(
            self.contact + rotation * Vec3::new(0.0, self.params.com_height, 0.0),
            rotation,
        )
    }

    fn gravity(&self) -> Vec3 {
        Vec3::new(0.0, -self.params.gravity, 0.0)
    }

    fn inverse_inertia_world(&self) -> Mat3 {
        // Roll pivots on the contact point; the other axes are fixed by the path.
        let local = Mat3::from_diagonal(Vec3::new(
            1.0 / self.params.inertia.x,
            1.0 / self.params.inertia.y,
            1.0 / self.params.contact_roll_inertia(),
        ));
        let rotation = Mat3::from_quat(self.rotation());
        rotation * local * rotation.transpose()
    }

    fn apply_torque_impulse(&mut self, impulse: Vec3) {
        if self.fallen {
            return;
        }
        let angular_change = self.inverse_inertia_world() * impulse;
        self.roll_rate += angular_change.dot(self.forward());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_pivoting_on_support_offset() {
        let params = BikeParams::default().pivoting_on(Vec3::new(0.0, -0.45, 0.0));
        assert!((params.com_height - 0.45).abs() < 1e-6);
        let unchanged = BikeParams::default().pivoting_on(Vec3::new(0.0, 0.3, 0.0));
        assert_eq!(unchanged, BikeParams::default());
    }

    #[test]
    fn test_upright_bike_balances_at_rest() {
        let mut bike = BikeBody::new(BikeParams::default(), Vec3::ZERO, 0.0);
        for _ in 0..600 {
            bike.step(DT);
        }
        assert_eq!(bike.roll(), 0.0);
        assert!(!bike.is_fallen());
    }

    #[test]
    fn test_tilted_bike_falls_toward_tilt() {
        let mut bike = BikeBody::new(BikeParams::default(), Vec3::ZERO, 0.0);
        bike.set_roll(0.05);
        for _ in 0..300 {
            bike.step(DT);
        }
        assert!(bike.is_fallen());
        assert!(bike.roll() > 0.0);
    }

    #[test]
    fn test_support_point_is_contact() {
        let mut bike = BikeBody::new(BikeParams::default(), Vec3::new(3.0, 0.0, 4.0), 1.0);
        bike.set_roll(0.3);
        let transform = bike.transform();
        let support = transform.transform_point(Vec3::new(0.0, -0.55, 0.0));
        assert!((support - bike.contact()).length() < 1e-5);
    }

    #[test]
    fn test_contact_follows_circle() {
        let mut bike = BikeBody::new(BikeParams::default(), Vec3::ZERO, 0.0);
        bike.set_motion(10.0, 0.5);
        bike.set_roll(bike.balanced_lean());
        // Positive yaw turns left, toward +X.
        assert!(bike.contact_acceleration().x > 0.0);
        assert!(bike.balanced_lean() < 0.0);
        bike.step(DT);
        assert!(bike.contact().z > 0.0);
    }

    #[test]
    fn test_balanced_lean_is_equilibrium() {
        let mut bike = BikeBody::new(BikeParams::default(), Vec3::ZERO, 0.0);
        bike.set_motion(10.0, 0.5);
        bike.set_roll(bike.balanced_lean());
        bike.step(DT);
        assert!(bike.roll_rate().abs() < 1e-3);
    }

    #[test]
    fn test_impulse_changes_roll_rate() {
        let mut bike = BikeBody::new(BikeParams::default(), Vec3::ZERO, 0.7);
        bike.set_roll(0.2);
        let inertia = bike.params().contact_roll_inertia();
        bike.apply_torque_impulse(bike.forward() * -inertia);
        assert!((bike.roll_rate() + 1.0).abs() < 1e-4);
    }
}
