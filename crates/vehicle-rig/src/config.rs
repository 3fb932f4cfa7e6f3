//! Tuning configuration for the camera and stabilizer.
//!
//! Every field has a default, so a configuration file only needs to list the
//! values it changes:
//!
//! ```toml
//! [camera]
//! mode = "free-orbit"
//! orbit_rate = 0.8
//!
//! [stabilizer]
//! support_offset = [0.0, -0.6, 0.0]
//! error_gain = 5.0
//! ```

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::{AnalogOrbit, CameraMode};
use crate::error::{Error, Result};

/// Chase/orbit camera tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    /// Whether the camera re-aligns behind the target every frame.
    pub mode: CameraMode,
    /// When pointer deltas orbit the camera.
    pub analog_orbit: AnalogOrbit,
    /// Angular rate of discrete orbit signals (rad/s).
    pub orbit_rate: f32,
    /// Exponent scale applied to analog zoom deltas.
    pub analog_zoom_multiplier: f32,
    /// Frustum Y tangent the camera starts with.
    pub initial_y_tangent: f32,
    /// Narrowest allowed zoom.
    pub min_y_tangent: f32,
    /// Widest allowed zoom.
    pub max_y_tangent: f32,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance. Range is limited to half of this.
    pub far: f32,
    /// Minimum angle between the look direction and world up (radians).
    pub up_avoid_angle: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            mode: CameraMode::Chase,
            analog_orbit: AnalogOrbit::Always,
            orbit_rate: 0.5,
            analog_zoom_multiplier: 0.3,
            // 45 degree vertical field of view.
            initial_y_tangent: 0.414_213_57,
            min_y_tangent: 0.01,
            max_y_tangent: 2.0,
            near: 0.5,
            far: 1000.0,
            up_avoid_angle: 0.3,
        }
    }
}

impl CameraConfig {
    /// Longest range the camera may use without clipping the target.
    #[must_use]
    pub fn max_range(&self) -> f32 {
        0.5 * self.far
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        positive("camera.orbit_rate", self.orbit_rate)?;
        finite("camera.analog_zoom_multiplier", self.analog_zoom_multiplier)?;
        positive("camera.min_y_tangent", self.min_y_tangent)?;
        positive("camera.max_y_tangent", self.max_y_tangent)?;
        if self.min_y_tangent > self.max_y_tangent {
            return Err(Error::InvalidConfig {
                field: "camera.min_y_tangent",
                detail: format!(
                    "{} exceeds max_y_tangent {}",
                    self.min_y_tangent, self.max_y_tangent
                ),
            });
        }
        positive("camera.initial_y_tangent", self.initial_y_tangent)?;
        positive("camera.near", self.near)?;
        positive("camera.far", self.far)?;
        if self.near >= self.far {
            return Err(Error::InvalidConfig {
                field: "camera.near",
                detail: format!("{} is not closer than far {}", self.near, self.far),
            });
        }
        if !(self.up_avoid_angle > 0.0 && self.up_avoid_angle < std::f32::consts::FRAC_PI_2) {
            return Err(Error::InvalidConfig {
                field: "camera.up_avoid_angle",
                detail: format!("{} is outside (0, pi/2)", self.up_avoid_angle),
            });
        }
        Ok(())
    }
}

/// Lean stabilizer tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StabilizerConfig {
    /// Body-local point approximating the ground contact.
    pub support_offset: Vec3,
    /// Smoothing lag of the acceleration estimate, in physics steps.
    pub lag: f32,
    /// Gain on the step-to-step change of the roll error.
    pub delta_gain: f32,
    /// Gain on the roll error itself.
    pub error_gain: f32,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            support_offset: Vec3::new(0.0, -0.55, 0.0),
            lag: 25.0,
            delta_gain: 2.0,
            error_gain: 4.0,
        }
    }
}

impl StabilizerConfig {
    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.support_offset.is_finite() {
            return Err(Error::InvalidConfig {
                field: "stabilizer.support_offset",
                detail: format!("{} is not finite", self.support_offset),
            });
        }
        if !(self.lag >= 1.0 && self.lag.is_finite()) {
            return Err(Error::InvalidConfig {
                field: "stabilizer.lag",
                detail: format!("{} is less than one step", self.lag),
            });
        }
        finite("stabilizer.delta_gain", self.delta_gain)?;
        finite("stabilizer.error_gain", self.error_gain)?;
        Ok(())
    }
}

/// Complete configuration file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RigConfig {
    pub camera: CameraConfig,
    pub stabilizer: StabilizerConfig,
}

impl RigConfig {
    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded rig configuration from {}", path.display());
        Ok(config)
    }

    /// Serialize to TOML text.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check both sections.
    pub fn validate(&self) -> Result<()> {
        self.camera.validate()?;
        self.stabilizer.validate()
    }
}

fn finite(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidConfig {
            field,
            detail: format!("{value} is not finite"),
        })
    }
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidConfig {
            field,
            detail: format!("{value} is not a positive number"),
        })
    }
}
