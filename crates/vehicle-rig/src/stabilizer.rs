//! Lean stabilization for two-wheeled vehicles.
//!
//! A bike only stays up when its up axis matches the direction of the
//! specific force at its tires: straight up when driving straight, leaned
//! into the turn when cornering. The stabilizer estimates the lateral
//! acceleration of the ground-contact point by finite differences and
//! applies a PD-controlled torque impulse about the forward axis to roll the
//! body toward that balanced lean.
//!
//! Must be called exactly once per fixed physics step, before the engine
//! integrates the step.

use glam::{Mat3, Vec3};

use crate::{
    config::StabilizerConfig,
    error::Result,
    physics::{BodyTransform, RigidBodyState},
};

/// Lateral axes shorter than this cannot define a roll direction.
const MIN_LATERAL_LENGTH: f32 = 1e-3;

/// Kinematic history carried between physics steps.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StabilizerHistory {
    /// Ground-contact estimate at the previous step.
    pub support_location: Vec3,
    /// Velocity of the contact point at the previous step.
    pub velocity: Vec3,
    /// Smoothed acceleration of the contact point.
    pub acceleration: Vec3,
    /// Roll error sine at the previous step.
    pub roll_error_sine: f32,
}

/// Result of one stabilization step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StabilizeOutcome {
    /// Stabilization is switched off; nothing was applied.
    Disabled,
    /// This impulse was applied to the body.
    Applied(Vec3),
    /// The body's left axis is vertical, so no roll axis exists this step.
    DegenerateAxis,
    /// The corrective impulse was not finite and was dropped.
    NonFiniteImpulse,
}

impl StabilizeOutcome {
    /// The applied impulse, if any.
    #[must_use]
    pub fn impulse(self) -> Option<Vec3> {
        match self {
            Self::Applied(impulse) => Some(impulse),
            _ => None,
        }
    }
}

/// PD roll controller for one vehicle.
#[derive(Clone, Debug)]
pub struct LeanStabilizer {
    config: StabilizerConfig,
    history: Option<StabilizerHistory>,
    enabled: bool,
}

impl LeanStabilizer {
    /// Create an enabled stabilizer with no history.
    ///
    /// The first [`stabilize`](Self::stabilize) call seeds the history from
    /// the body's pose, as if the vehicle had just been warped there.
    pub fn new(config: StabilizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            history: None,
            enabled: true,
        })
    }

    #[must_use]
    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    /// Persisted state from the previous step.
    #[must_use]
    pub fn history(&self) -> Option<&StabilizerHistory> {
        self.history.as_ref()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stop stabilizing until the next [`warp`](Self::warp).
    pub fn destabilize(&mut self) {
        if self.enabled {
            tracing::debug!("Lean stabilization disabled");
        }
        self.enabled = false;
    }

    /// Reset after the vehicle was teleported to `transform`.
    ///
    /// Clears velocity, acceleration and roll error so the jump in position
    /// does not read as motion, and re-enables stabilization.
    pub fn warp(&mut self, transform: &BodyTransform) {
        self.history = Some(StabilizerHistory {
            support_location: transform.transform_point(self.config.support_offset),
            ..Default::default()
        });
        self.enabled = true;
    }

    /// Run one physics step of `dt` seconds against `body`.
    pub fn stabilize(&mut self, dt: f32, body: &mut dyn RigidBodyState) -> StabilizeOutcome {
        assert!(
            dt > 0.0 && dt.is_finite(),
            "physics time step must be positive, got {dt}"
        );
        if !self.enabled {
            return StabilizeOutcome::Disabled;
        }

        let transform = body.transform();
        if self.history.is_none() {
            self.warp(&transform);
        }
        let previous = self.history.unwrap_or_default();

        // Body axes: +X left, +Y up, +Z forward.
        let rotation = Mat3::from_quat(transform.rotation);
        let left = rotation.x_axis;
        let up = rotation.y_axis;
        let forward = rotation.z_axis;

        // Finite-difference the contact point, then smooth the acceleration.
        let support_location = transform.transform_point(self.config.support_offset);
        let velocity = (support_location - previous.support_location) / dt;
        let raw_acceleration = (velocity - previous.velocity) / dt;
        let acceleration = previous
            .acceleration
            .lerp(raw_acceleration, 1.0 / self.config.lag);

        let mut history = StabilizerHistory {
            support_location,
            velocity,
            acceleration,
            roll_error_sine: previous.roll_error_sine,
        };

        let lateral = Vec3::new(left.x, 0.0, left.z);
        let lateral_length = lateral.length();
        if lateral_length < MIN_LATERAL_LENGTH {
            tracing::warn!(
                "Cannot stabilize: left axis {} has no horizontal component",
                left
            );
            self.history = Some(history);
            return StabilizeOutcome::DegenerateAxis;
        }
        let lateral = lateral / lateral_length;

        // Up axis that balances gravity against cornering.
        let lateral_acceleration = lateral * acceleration.dot(lateral);
        let desired_up = (lateral_acceleration - body.gravity()).normalize_or(up);

        // Keep only the roll part of the error; pitch is not ours to fix.
        let roll_error_sine = up.cross(desired_up).dot(forward);
        let delta = roll_error_sine - previous.roll_error_sine;
        let magnitude = delta * self.config.delta_gain + roll_error_sine * self.config.error_gain;
        history.roll_error_sine = roll_error_sine;
        self.history = Some(history);

        // A singular tensor inverts to infinities or NaN and is caught below.
        let inverse_inertia = body.inverse_inertia_world();
        let impulse = inverse_inertia.inverse() * (forward * magnitude);
        if !impulse.is_finite() {
            tracing::warn!(
                "Dropping non-finite stabilization impulse (inverse inertia determinant {})",
                inverse_inertia.determinant()
            );
            return StabilizeOutcome::NonFiniteImpulse;
        }

        body.apply_torque_impulse(impulse);
        StabilizeOutcome::Applied(impulse)
    }
}
