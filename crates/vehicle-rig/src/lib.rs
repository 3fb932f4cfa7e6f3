//! Engine-independent camera and balance controllers for vehicle simulation.
//!
//! This crate holds the two pieces of a vehicle demo that carry real math and
//! no engine baggage:
//!
//! - [`camera::ChaseCamera`]: a chase/orbit camera that keeps the target in
//!   view, shortens its range when the line of sight is obstructed, and never
//!   gimbal-locks against world up.
//! - [`stabilizer::LeanStabilizer`]: a PD controller that keeps a two-wheeled
//!   vehicle balanced, leaning into turns by the physically correct angle.
//!
//! Both consume plain data through the collaborator traits in [`physics`] and
//! [`target`], so any physics engine or scene graph can drive them.
//!
//! # Conventions
//!
//! - World up is `+Y`.
//! - Vehicle bodies use body-local `+X` = left, `+Y` = up, `+Z` = forward.
//! - Camera rotations follow the glam convention: local `-Z` looks forward.
//!
//! # Example
//!
//! ```ignore
//! use vehicle_rig::{ChaseCamera, CameraConfig, CameraInput, ObstructAll, TargetState};
//!
//! let mut camera = ChaseCamera::new(CameraConfig::default(), Vec3::new(0.0, 2.0, -5.0))?;
//! let mut input = CameraInput::default();
//!
//! // Once per rendered frame.
//! let target = TargetState::capture(&vehicle);
//! let pose = camera.update(dt, &target, &mut input, &world, &ObstructAll);
//! ```

pub mod camera;
pub mod config;
mod error;
pub mod physics;
pub mod stabilizer;
pub mod target;

pub use camera::{
    AnalogDeltas, AnalogOrbit, CameraInput, CameraMode, CameraPose, ChaseCamera, Frustum,
    SignalSet,
};
pub use config::{CameraConfig, RigConfig, StabilizerConfig};
pub use error::{Error, Result};
pub use physics::{
    BodyHandle, BodyTransform, ObstructAll, ObstructionFilter, RayCastProvider, RayHit,
    RigidBodyState,
};
pub use stabilizer::{LeanStabilizer, StabilizeOutcome, StabilizerHistory};
pub use target::{TargetProvider, TargetState};

/// World up direction shared by both controllers.
pub const WORLD_UP: glam::Vec3 = glam::Vec3::Y;
