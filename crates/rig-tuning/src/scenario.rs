//! Scripted tuning runs.
//!
//! Both scenarios step at a fixed 60 Hz, write one telemetry row per step,
//! and return a summary for the caller to print.

use glam::Vec3;
use rand::{Rng, SeedableRng, rngs::StdRng};
use vehicle_rig::{
    BodyHandle, CameraInput, CameraMode, ChaseCamera, LeanStabilizer, ObstructAll, RigConfig,
    RigidBodyState, SignalSet, StabilizeOutcome, TargetProvider, TargetState,
};

use crate::{
    bike::{BikeBody, BikeParams},
    telemetry::{
        ChaseSnapshot, LeanSnapshot, TelemetryOutput, emit_chase_telemetry, emit_lean_telemetry,
        reset_chase_telemetry, reset_lean_telemetry,
    },
    world::SimWorld,
};

/// Fixed timestep for both scenarios (60 Hz).
pub const FIXED_TIMESTEP: f32 = 1.0 / 60.0;

/// How far the bike jumps when warped mid-run.
pub const WARP_OFFSET: Vec3 = Vec3::new(25.0, 0.0, 40.0);

/// Roll within this of the balanced lean counts as settled.
const SETTLED_TOLERANCE: f32 = 0.035;

/// Camera margin inside a box that counts as clipping.
const CLIP_MARGIN: f32 = 1e-3;

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn step_count(duration: f32) -> usize {
    (duration.max(0.0) / FIXED_TIMESTEP).round() as usize
}

/// A point driving a circle (or a straight line) on the ground.
#[derive(Clone, Copy, Debug)]
pub struct PathTarget {
    position: Vec3,
    heading: f32,
    speed: f32,
    yaw_rate: f32,
    height: f32,
}

impl PathTarget {
    /// Collision body of the followed vehicle.
    pub const BODY: BodyHandle = BodyHandle(1);

    /// Target starting at the origin facing +Z, looked at from `height` above
    /// the ground.
    #[must_use]
    pub fn new(speed: f32, yaw_rate: f32, height: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            heading: 0.0,
            speed,
            yaw_rate,
            height,
        }
    }

    pub fn step(&mut self, dt: f32) {
        self.position += self.forward_direction() * (self.speed * dt);
        self.heading += self.yaw_rate * dt;
    }

    /// Horizontal distance from `point` to the path.
    #[must_use]
    pub fn distance_to_path(&self, point: Vec3) -> f32 {
        if self.yaw_rate.abs() < 1e-6 {
            return point.x.abs();
        }
        let radius = self.speed / self.yaw_rate;
        let center = Vec3::new(radius, 0.0, 0.0);
        let horizontal = Vec3::new(point.x, 0.0, point.z);
        (horizontal.distance(center) - radius.abs()).abs()
    }
}

impl TargetProvider for PathTarget {
    fn forward_direction(&self) -> Vec3 {
        Vec3::new(self.heading.sin(), 0.0, self.heading.cos())
    }

    fn target_point(&self) -> Vec3 {
        self.position + Vec3::new(0.0, self.height, 0.0)
    }

    fn collision_body(&self) -> BodyHandle {
        Self::BODY
    }
}

/// Parameters of a chase-camera run.
#[derive(Clone, Debug)]
pub struct ChaseScenario {
    pub duration: f32,
    pub speed: f32,
    pub yaw_rate: f32,
    pub mode: CameraMode,
    /// Hold x-ray for the whole run.
    pub xray: bool,
    pub obstacles: usize,
    pub seed: u64,
    /// Drive the camera with the built-in input script.
    pub scripted_input: bool,
    /// Starting offset from the target.
    pub initial_offset: Vec3,
}

impl Default for ChaseScenario {
    fn default() -> Self {
        Self {
            duration: 20.0,
            speed: 8.0,
            yaw_rate: 0.2,
            mode: CameraMode::Chase,
            xray: false,
            obstacles: 40,
            seed: 0,
            scripted_input: true,
            initial_offset: Vec3::new(0.0, 2.0, -6.0),
        }
    }
}

/// Signals held at `elapsed` seconds by the built-in input script.
#[must_use]
pub fn scripted_signals(elapsed: f32) -> SignalSet {
    match elapsed {
        t if (1.0..2.0).contains(&t) => SignalSet::ORBIT_UP,
        t if (2.0..4.0).contains(&t) => SignalSet::ORBIT_CW,
        t if (4.0..5.0).contains(&t) => SignalSet::BACK,
        t if (5.0..5.5).contains(&t) => SignalSet::FORWARD,
        t if (6.0..6.5).contains(&t) => SignalSet::ZOOM_IN,
        t if (7.0..7.5).contains(&t) => SignalSet::ZOOM_OUT,
        t if (8.0..9.0).contains(&t) => SignalSet::ORBIT_DOWN,
        _ => SignalSet::empty(),
    }
}

/// Summary of a chase run.
#[derive(Clone, Debug, Default)]
pub struct ChaseReport {
    pub steps: usize,
    pub obstacles: usize,
    /// Steps where the camera was pulled in front of its preferred range.
    pub obstructed_steps: usize,
    /// Steps where the camera ended up inside an obstacle.
    pub clipped_steps: usize,
    pub min_range: f32,
    pub max_range: f32,
    pub final_range: f32,
    pub final_preferred_range: f32,
    pub final_y_tangent: f32,
}

/// Follow a target through a field of boxes.
pub fn run_chase(
    config: &RigConfig,
    scenario: &ChaseScenario,
    output: &mut dyn TelemetryOutput,
) -> vehicle_rig::Result<ChaseReport> {
    let mut camera_config = config.camera.clone();
    camera_config.mode = scenario.mode;
    let mut camera = ChaseCamera::new(camera_config, scenario.initial_offset)?;

    let mut target = PathTarget::new(scenario.speed, scenario.yaw_rate, 1.0);
    let path = target;
    let mut rng = StdRng::seed_from_u64(scenario.seed);
    let mut world = SimWorld::new();
    let placed = world.scatter_boxes(
        &mut rng,
        scenario.obstacles,
        path.target_point(),
        60.0,
        |center, half_extents| {
            path.distance_to_path(center) > half_extents.x.hypot(half_extents.z) + 1.0
        },
    );
    tracing::info!(
        "Chase run: {:.1} s at {:.1} m/s, {} obstacles, mode {:?}",
        scenario.duration,
        scenario.speed,
        placed,
        scenario.mode
    );

    reset_chase_telemetry(output);
    let mut report = ChaseReport {
        obstacles: placed,
        min_range: f32::INFINITY,
        ..Default::default()
    };
    let mut elapsed = 0.0;
    for _ in 0..step_count(scenario.duration) {
        target.step(FIXED_TIMESTEP);
        elapsed += FIXED_TIMESTEP;

        let mut signals = if scenario.scripted_input {
            scripted_signals(elapsed)
        } else {
            SignalSet::empty()
        };
        signals.set(SignalSet::XRAY, scenario.xray);
        let mut input = CameraInput::with_signals(signals);

        let state = TargetState::capture(&target);
        let pose = camera.update(FIXED_TIMESTEP, &state, &mut input, &world, &ObstructAll);

        let range = camera.range();
        let obstructed = range < camera.preferred_range() - 1e-3;
        let clipped = world
            .obstacles()
            .iter()
            .any(|obstacle| obstacle.contains(pose.position, CLIP_MARGIN));
        if clipped {
            tracing::warn!("Camera inside an obstacle at {:.2} s", elapsed);
        }

        report.steps += 1;
        report.obstructed_steps += usize::from(obstructed);
        report.clipped_steps += usize::from(clipped);
        report.min_range = report.min_range.min(range);
        report.max_range = report.max_range.max(range);

        emit_chase_telemetry(
            &ChaseSnapshot {
                elapsed,
                target: state.point,
                camera: pose.position,
                look: pose.look_direction,
                range,
                preferred_range: camera.preferred_range(),
                y_tangent: camera.y_tangent(),
                xray: signals.contains(SignalSet::XRAY),
                obstructed,
            },
            output,
        );
    }

    report.final_range = camera.range();
    report.final_preferred_range = camera.preferred_range();
    report.final_y_tangent = camera.y_tangent();
    if report.steps == 0 {
        report.min_range = report.final_range;
        report.max_range = report.final_range;
    }
    Ok(report)
}

/// Parameters of a lean-stabilization run.
#[derive(Clone, Debug)]
pub struct LeanScenario {
    pub duration: f32,
    pub speed: f32,
    pub yaw_rate: f32,
    /// Roll at the start of the run, in radians.
    pub initial_roll: f32,
    pub stabilized: bool,
    /// Teleport the bike by [`WARP_OFFSET`] at this time.
    pub warp_at: Option<f32>,
    /// Tell the stabilizer about the teleport.
    pub reset_on_warp: bool,
    /// Peak random roll impulse per step, in N·m·s.
    pub noise: f32,
    pub seed: u64,
    pub bike: BikeParams,
}

impl Default for LeanScenario {
    fn default() -> Self {
        Self {
            duration: 10.0,
            speed: 10.0,
            yaw_rate: 0.0,
            initial_roll: 0.0,
            stabilized: true,
            warp_at: None,
            reset_on_warp: true,
            noise: 0.0,
            seed: 0,
            bike: BikeParams::default(),
        }
    }
}

/// Summary of a lean run.
#[derive(Clone, Debug, Default)]
pub struct LeanReport {
    pub steps: usize,
    /// Time the bike went down, if it did.
    pub fell_at: Option<f32>,
    pub max_abs_roll: f32,
    pub final_roll: f32,
    pub balanced_lean: f32,
    /// Time after which roll stayed near the balanced lean.
    pub settled_at: Option<f32>,
    pub max_impulse: f32,
    pub degenerate_steps: usize,
    pub dropped_steps: usize,
    pub warped: bool,
}

impl LeanReport {
    /// Final distance from the balanced lean, in radians.
    #[must_use]
    pub fn final_lean_error(&self) -> f32 {
        (self.final_roll - self.balanced_lean).abs()
    }
}

/// Ride the pendulum bike with or without the stabilizer.
pub fn run_lean(
    config: &RigConfig,
    scenario: &LeanScenario,
    output: &mut dyn TelemetryOutput,
) -> vehicle_rig::Result<LeanReport> {
    let mut stabilizer = LeanStabilizer::new(config.stabilizer.clone())?;

    let mut bike = BikeBody::new(scenario.bike, Vec3::ZERO, 0.0);
    bike.set_motion(scenario.speed, scenario.yaw_rate);
    bike.set_roll(scenario.initial_roll);
    stabilizer.warp(&bike.transform());
    if !scenario.stabilized {
        stabilizer.destabilize();
    }

    let balanced_lean = bike.balanced_lean();
    tracing::info!(
        "Lean run: {:.1} s at {:.1} m/s, yaw rate {:.2} rad/s, balanced lean {:.1} degrees",
        scenario.duration,
        scenario.speed,
        scenario.yaw_rate,
        balanced_lean.to_degrees()
    );

    let mut rng = StdRng::seed_from_u64(scenario.seed);
    reset_lean_telemetry(output);
    let mut report = LeanReport {
        balanced_lean,
        final_roll: bike.roll(),
        ..Default::default()
    };
    let mut last_unsettled = None;
    let mut elapsed = 0.0;
    for _ in 0..step_count(scenario.duration) {
        if let Some(warp_at) = scenario.warp_at
            && !report.warped
            && elapsed >= warp_at
        {
            bike.teleport(bike.contact() + WARP_OFFSET, bike.heading());
            if scenario.reset_on_warp {
                stabilizer.warp(&bike.transform());
                if !scenario.stabilized {
                    stabilizer.destabilize();
                }
            }
            tracing::debug!("Warped bike at {:.2} s", elapsed);
            report.warped = true;
        }

        if scenario.noise > 0.0 {
            bike.disturb(rng.random_range(-scenario.noise..=scenario.noise));
        }

        let outcome = stabilizer.stabilize(FIXED_TIMESTEP, &mut bike);
        match outcome {
            StabilizeOutcome::Applied(impulse) => {
                report.max_impulse = report.max_impulse.max(impulse.length());
            }
            StabilizeOutcome::DegenerateAxis => report.degenerate_steps += 1,
            StabilizeOutcome::NonFiniteImpulse => report.dropped_steps += 1,
            StabilizeOutcome::Disabled => {}
        }

        bike.step(FIXED_TIMESTEP);
        elapsed += FIXED_TIMESTEP;
        report.steps += 1;
        report.final_roll = bike.roll();
        report.max_abs_roll = report.max_abs_roll.max(bike.roll().abs());
        if (bike.roll() - balanced_lean).abs() > SETTLED_TOLERANCE {
            last_unsettled = Some(elapsed);
        }

        emit_lean_telemetry(
            &LeanSnapshot {
                elapsed,
                position: bike.contact(),
                speed: bike.speed(),
                yaw_rate: bike.yaw_rate(),
                roll: bike.roll(),
                roll_rate: bike.roll_rate(),
                balanced_lean,
                roll_error_sine: stabilizer
                    .history()
                    .map_or(0.0, |history| history.roll_error_sine),
                outcome,
                forward: bike.forward(),
                fallen: bike.is_fallen(),
            },
            output,
        );

        if bike.is_fallen() {
            report.fell_at = Some(elapsed);
            break;
        }
    }

    if report.fell_at.is_none() && report.final_lean_error() <= SETTLED_TOLERANCE {
        report.settled_at = Some(last_unsettled.unwrap_or(0.0));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{MemoryTelemetryOutput, NullTelemetryOutput};

    #[test]
    fn test_path_target_circles() {
        let mut target = PathTarget::new(10.0, 0.5, 1.0);
        for _ in 0..600 {
            target.step(FIXED_TIMESTEP);
            assert!(target.distance_to_path(target.target_point()) < 0.15);
        }
    }

    #[test]
    fn test_straight_path_distance() {
        let target = PathTarget::new(10.0, 0.0, 1.0);
        assert!((target.distance_to_path(Vec3::new(-3.0, 0.0, 50.0)) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_script_holds_one_signal() {
        assert!(scripted_signals(0.5).is_empty());
        assert!(scripted_signals(1.5).contains(SignalSet::ORBIT_UP));
        assert!(scripted_signals(4.5).contains(SignalSet::BACK));
        assert_eq!(scripted_signals(6.2).iter().count(), 1);
    }

    #[test]
    fn test_chase_writes_a_row_per_step() {
        let mut output = MemoryTelemetryOutput::default();
        let scenario = ChaseScenario {
            duration: 1.0,
            obstacles: 5,
            ..Default::default()
        };
        let report = run_chase(&RigConfig::default(), &scenario, &mut output).unwrap();
        assert_eq!(report.steps, 60);
        assert_eq!(output.rows.len(), 60);
        assert!(output.header.is_some());
    }

    #[test]
    fn test_zero_duration_runs_nothing() {
        let scenario = LeanScenario {
            duration: 0.0,
            ..Default::default()
        };
        let report = run_lean(&RigConfig::default(), &scenario, &mut NullTelemetryOutput).unwrap();
        assert_eq!(report.steps, 0);
        assert!(report.fell_at.is_none());
    }

    #[test]
    fn test_invalid_offset_is_an_error() {
        let scenario = ChaseScenario {
            initial_offset: Vec3::ZERO,
            ..Default::default()
        };
        assert!(run_chase(&RigConfig::default(), &scenario, &mut NullTelemetryOutput).is_err());
    }
}
