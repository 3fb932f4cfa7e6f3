//! Chase/orbit camera controller.
//!
//! Third-person camera that follows a target, keeping it in view.
//!
//! ## Per-frame pipeline
//!
//! 1. Orbit: discrete signals and analog deltas rotate the offset, keeping
//!    its length.
//! 2. Up avoidance: the look direction never comes within
//!    [`CameraConfig::up_avoid_angle`] of world up or down.
//! 3. Chase alignment: in [`CameraMode::Chase`] the camera swings behind the
//!    target's forward direction.
//! 4. Range: Forward/Back scale the range exponentially.
//! 5. Obstruction: unless Xray is active, the range is cut to the first solid
//!    body between target and camera.
//! 6. Zoom: ZoomIn/ZoomOut and the wheel scale the frustum Y tangent.

mod frustum;
pub mod obstruction;
pub mod orbit;
mod signals;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::{
    config::CameraConfig,
    error::{Error, Result},
    physics::{ObstructionFilter, RayCastProvider},
    target::TargetState,
};

pub use frustum::Frustum;
pub use obstruction::nearest_obstruction;
pub use orbit::{align_to_forward, avoid_up_singularity, look_rotation};
pub use signals::{AnalogDeltas, CameraInput, SignalSet};

/// Closest the camera may get to the target point.
pub const MIN_RANGE: f32 = 1e-3;

/// How the camera treats the target's heading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraMode {
    /// Swing behind the target every frame.
    #[default]
    Chase,
    /// Keep the offset fixed in world orientation.
    FreeOrbit,
}

/// When analog pitch/yaw deltas orbit the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalogOrbit {
    /// Every pointer motion orbits.
    #[default]
    Always,
    /// Only while [`SignalSet::DRAG_TO_ORBIT`] is active.
    WhileDragging,
}

/// Camera placement for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    /// World position.
    pub position: Vec3,
    /// World rotation; local `-Z` points along `look_direction`.
    pub rotation: Quat,
    /// Unit look direction.
    pub look_direction: Vec3,
}

/// Chase/orbit camera state.
#[derive(Clone, Debug)]
pub struct ChaseCamera {
    config: CameraConfig,
    /// Target to camera. Never zero-length.
    offset: Vec3,
    /// Range the camera returns to when nothing obstructs it.
    preferred_range: f32,
    look_direction: Vec3,
    y_tangent: f32,
}

impl ChaseCamera {
    /// Create a camera at `offset` from its target.
    pub fn new(config: CameraConfig, offset: Vec3) -> Result<Self> {
        config.validate()?;
        let look_direction = look_from_offset(offset)?;
        let y_tangent = config
            .initial_y_tangent
            .clamp(config.min_y_tangent, config.max_y_tangent);
        let preferred_range = offset.length().clamp(MIN_RANGE, config.max_range());
        Ok(Self {
            config,
            offset,
            preferred_range,
            look_direction,
            y_tangent,
        })
    }

    /// Advance the camera by `dt` seconds and return its new pose.
    ///
    /// Analog deltas in `input` are consumed and reset to zero.
    pub fn update(
        &mut self,
        dt: f32,
        target: &TargetState,
        input: &mut CameraInput,
        world: &dyn RayCastProvider,
        filter: &dyn ObstructionFilter,
    ) -> CameraPose {
        assert!(
            dt.is_finite() && dt >= 0.0,
            "camera time step must be finite and non-negative, got {dt}"
        );
        let signals = input.signals;
        let analog = input.analog.take();

        // Orbit.
        self.offset = orbit::orbit_discrete(
            self.offset,
            signals.axis(SignalSet::ORBIT_UP, SignalSet::ORBIT_DOWN),
            signals.axis(SignalSet::ORBIT_CW, SignalSet::ORBIT_CCW),
            self.config.orbit_rate * dt,
        );
        let analog_orbit = match self.config.analog_orbit {
            AnalogOrbit::Always => true,
            AnalogOrbit::WhileDragging => signals.contains(SignalSet::DRAG_TO_ORBIT),
        };
        if analog_orbit {
            // Scale by zoom so the view turns at the same apparent speed.
            self.offset = orbit::orbit_analog(
                self.offset,
                analog.pitch * self.y_tangent,
                analog.yaw * self.y_tangent,
            );
        }

        let mut range = self.offset.length();
        let mut look = avoid_up_singularity(-self.offset / range, self.config.up_avoid_angle);

        if self.config.mode == CameraMode::Chase {
            match align_to_forward(look, target.forward) {
                Some(aligned) => look = aligned,
                None => tracing::trace!(
                    "Skipping chase alignment, target forward {}",
                    target.forward
                ),
            }
        }

        // Range.
        let xray = signals.contains(SignalSet::XRAY);
        let forward_sum = signals.axis(SignalSet::FORWARD, SignalSet::BACK);
        if forward_sum != 0 {
            range *= (-dt * f32::from(forward_sum)).exp();
            if forward_sum > 0 || xray {
                self.preferred_range = range.clamp(MIN_RANGE, self.config.max_range());
            }
        }
        let max_range = self.config.max_range();
        range = range.min(max_range);

        if !xray {
            let ray_range = range.max(self.preferred_range).min(max_range);
            range = obstruction::line_of_sight_range(world, filter, target, look, ray_range);
        }
        range = range.clamp(MIN_RANGE, max_range);

        // Zoom.
        let zoom_sum = signals.axis(SignalSet::ZOOM_IN, SignalSet::ZOOM_OUT);
        if zoom_sum != 0 {
            self.y_tangent *= (-dt * f32::from(zoom_sum)).exp();
        }
        if analog.zoom != 0.0 {
            self.y_tangent *= (self.config.analog_zoom_multiplier * analog.zoom).exp();
        }
        self.y_tangent = self
            .y_tangent
            .clamp(self.config.min_y_tangent, self.config.max_y_tangent);

        self.look_direction = look;
        self.offset = -look * range;

        CameraPose {
            position: target.point + self.offset,
            rotation: look_rotation(look),
            look_direction: look,
        }
    }

    /// Perspective frustum for the current zoom.
    #[must_use]
    pub fn frustum(&self, aspect_ratio: f32) -> Frustum {
        Frustum::perspective(
            self.y_tangent,
            aspect_ratio,
            self.config.near,
            self.config.far,
        )
    }

    /// Target to camera vector.
    #[must_use]
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// Replace the offset, e.g. after teleporting the target.
    ///
    /// The new length also becomes the preferred range.
    pub fn set_offset(&mut self, offset: Vec3) -> Result<()> {
        self.look_direction = look_from_offset(offset)?;
        self.offset = offset;
        self.preferred_range = offset.length().clamp(MIN_RANGE, self.config.max_range());
        Ok(())
    }

    /// Current distance to the target.
    #[must_use]
    pub fn range(&self) -> f32 {
        self.offset.length()
    }

    #[must_use]
    pub fn preferred_range(&self) -> f32 {
        self.preferred_range
    }

    /// Set the unobstructed range, clamped to the usable interval.
    pub fn set_preferred_range(&mut self, range: f32) {
        if range.is_finite() {
            self.preferred_range = range.clamp(MIN_RANGE, self.config.max_range());
        }
    }

    #[must_use]
    pub fn look_direction(&self) -> Vec3 {
        self.look_direction
    }

    #[must_use]
    pub fn y_tangent(&self) -> f32 {
        self.y_tangent
    }

    /// Set the zoom, clamped to the configured limits.
    pub fn set_y_tangent(&mut self, y_tangent: f32) {
        if y_tangent.is_finite() {
            self.y_tangent = y_tangent.clamp(self.config.min_y_tangent, self.config.max_y_tangent);
        }
    }

    #[must_use]
    pub fn mode(&self) -> CameraMode {
        self.config.mode
    }

    pub fn set_mode(&mut self, mode: CameraMode) {
        self.config.mode = mode;
    }

    #[must_use]
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}

fn look_from_offset(offset: Vec3) -> Result<Vec3> {
    if !offset.is_finite() {
        return Err(Error::DegenerateOffset);
    }
    (-offset).try_normalize().ok_or(Error::DegenerateOffset)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{
        WORLD_UP,
        physics::{BodyHandle, ObstructAll, RayHit},
    };

    const DT: f32 = 1.0 / 60.0;

    fn no_hits(_from: Vec3, _to: Vec3) -> Vec<RayHit> {
        Vec::new()
    }

    fn target_at(point: Vec3) -> TargetState {
        TargetState {
            point,
            forward: Vec3::Z,
            body: BodyHandle(1),
        }
    }

    fn camera(offset: Vec3) -> ChaseCamera {
        ChaseCamera::new(CameraConfig::default(), offset).unwrap()
    }

    fn free_orbit(offset: Vec3) -> ChaseCamera {
        let config = CameraConfig {
            mode: CameraMode::FreeOrbit,
            ..Default::default()
        };
        ChaseCamera::new(config, offset).unwrap()
    }

    #[test]
    fn test_rejects_zero_offset() {
        let err = ChaseCamera::new(CameraConfig::default(), Vec3::ZERO).unwrap_err();
        assert_eq!(err, Error::DegenerateOffset);
        let err = ChaseCamera::new(CameraConfig::default(), Vec3::new(f32::NAN, 0.0, 1.0))
            .unwrap_err();
        assert_eq!(err, Error::DegenerateOffset);
    }

    #[test]
    fn test_orbit_preserves_offset_length() {
        let offset = Vec3::new(0.0, 2.0, -5.0);
        let mut cam = free_orbit(offset);
        let target = target_at(Vec3::ZERO);
        let sequences = [
            SignalSet::ORBIT_UP,
            SignalSet::ORBIT_CW,
            SignalSet::ORBIT_DOWN | SignalSet::ORBIT_CCW,
            SignalSet::ORBIT_UP | SignalSet::ORBIT_DOWN,
        ];
        for signals in sequences {
            for _ in 0..120 {
                let before = cam.offset().length();
                let mut input = CameraInput::with_signals(signals);
                cam.update(DT, &target, &mut input, &no_hits, &ObstructAll);
                assert!((cam.offset().length() - before).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_free_orbit_keeps_world_orientation() {
        let offset = Vec3::new(3.0, 2.0, 0.0);
        let mut cam = free_orbit(offset);
        let mut target = target_at(Vec3::ZERO);
        target.forward = Vec3::new(-1.0, 0.0, 0.0);
        cam.update(DT, &target, &mut CameraInput::default(), &no_hits, &ObstructAll);
        assert!((cam.offset() - offset).length() < 1e-4);
    }

    #[test]
    fn test_chase_swings_behind_target() {
        let mut cam = camera(Vec3::new(5.0, 2.0, 0.0));
        let mut target = target_at(Vec3::ZERO);
        target.forward = Vec3::new(0.0, 0.0, -1.0);
        let pose = cam.update(DT, &target, &mut CameraInput::default(), &no_hits, &ObstructAll);
        // Behind a target facing -Z is +Z.
        assert!((pose.position.z - 5.0).abs() < 1e-4);
        assert!(pose.position.x.abs() < 1e-4);
        assert!((pose.position.y - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_chase_tolerates_vertical_forward() {
        let offset = Vec3::new(0.0, 2.0, -5.0);
        let mut cam = camera(offset);
        let mut target = target_at(Vec3::ZERO);
        target.forward = Vec3::Y;
        cam.update(DT, &target, &mut CameraInput::default(), &no_hits, &ObstructAll);
        assert!(cam.offset().is_finite());
        assert!((cam.offset() - offset).length() < 1e-4);
    }

    #[test]
    fn test_obstruction_shortens_range() {
        let offset = Vec3::new(0.0, 2.0, -5.0);
        let ray_range = offset.length();
        let mut cam = camera(offset);
        let world = |_from: Vec3, _to: Vec3| {
            vec![
                RayHit {
                    fraction: 0.9,
                    body: BodyHandle(3),
                    normal: Vec3::Z,
                },
                RayHit {
                    fraction: 0.4,
                    body: BodyHandle(2),
                    normal: Vec3::Z,
                },
                // The target's own body never obstructs.
                RayHit {
                    fraction: 0.05,
                    body: BodyHandle(1),
                    normal: Vec3::Z,
                },
            ]
        };
        let target = target_at(Vec3::ZERO);
        cam.update(DT, &target, &mut CameraInput::default(), &world, &ObstructAll);
        assert!((cam.range() - ray_range * 0.4).abs() < 1e-4);
        assert!((cam.preferred_range() - ray_range).abs() < 1e-4);

        // Obstruction gone: the camera returns to its preferred range.
        cam.update(DT, &target, &mut CameraInput::default(), &no_hits, &ObstructAll);
        assert!((cam.range() - ray_range).abs() < 1e-4);
    }

    #[test]
    fn test_xray_ignores_obstructions() {
        let offset = Vec3::new(0.0, 2.0, -5.0);
        let mut cam = camera(offset);
        let world = |_from: Vec3, _to: Vec3| {
            vec![RayHit {
                fraction: 0.25,
                body: BodyHandle(2),
                normal: Vec3::Z,
            }]
        };
        let mut input = CameraInput::with_signals(SignalSet::XRAY);
        cam.update(DT, &target_at(Vec3::ZERO), &mut input, &world, &ObstructAll);
        assert!((cam.range() - offset.length()).abs() < 1e-4);
    }

    #[test]
    fn test_filtered_bodies_do_not_obstruct() {
        let offset = Vec3::new(0.0, 2.0, -5.0);
        let mut cam = camera(offset);
        let world = |_from: Vec3, _to: Vec3| {
            vec![RayHit {
                fraction: 0.25,
                body: BodyHandle(99),
                normal: Vec3::Z,
            }]
        };
        let solid = |body: BodyHandle| body != BodyHandle(99);
        cam.update(
            DT,
            &target_at(Vec3::ZERO),
            &mut CameraInput::default(),
            &world,
            &solid,
        );
        assert!((cam.range() - offset.length()).abs() < 1e-4);
    }

    #[test]
    fn test_back_keeps_preferred_range() {
        let offset = Vec3::new(0.0, 0.0, -5.0);
        let mut cam = camera(offset);
        let mut input = CameraInput::with_signals(SignalSet::BACK);
        cam.update(1.0, &target_at(Vec3::ZERO), &mut input, &no_hits, &ObstructAll);
        assert!((cam.range() - 5.0 * 1f32.exp()).abs() < 1e-3);
        assert!((cam.preferred_range() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_forward_sets_preferred_range() {
        let offset = Vec3::new(0.0, 0.0, -5.0);
        let mut cam = camera(offset);
        let mut input = CameraInput::with_signals(SignalSet::FORWARD);
        cam.update(0.5, &target_at(Vec3::ZERO), &mut input, &no_hits, &ObstructAll);
        let expected = 5.0 * (-0.5f32).exp();
        assert!((cam.range() - expected).abs() < 1e-4);
        assert!((cam.preferred_range() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_range_limited_by_far_plane() {
        let mut cam = camera(Vec3::new(0.0, 0.0, -400.0));
        let mut input = CameraInput::with_signals(SignalSet::BACK);
        cam.update(1.0, &target_at(Vec3::ZERO), &mut input, &no_hits, &ObstructAll);
        assert!((cam.range() - cam.config().max_range()).abs() < 1e-3);
    }

    #[test]
    fn test_zoom_clamps() {
        let mut cam = camera(Vec3::new(0.0, 2.0, -5.0));
        let target = target_at(Vec3::ZERO);
        let mut input = CameraInput::with_signals(SignalSet::ZOOM_IN);
        for _ in 0..100 {
            cam.update(0.5, &target, &mut input, &no_hits, &ObstructAll);
        }
        assert!((cam.y_tangent() - cam.config().min_y_tangent).abs() < 1e-6);

        let mut input = CameraInput::with_signals(SignalSet::ZOOM_OUT);
        for _ in 0..100 {
            cam.update(0.5, &target, &mut input, &no_hits, &ObstructAll);
        }
        assert!((cam.y_tangent() - cam.config().max_y_tangent).abs() < 1e-6);
    }

    #[test]
    fn test_analog_zoom_consumed() {
        let mut cam = camera(Vec3::new(0.0, 2.0, -5.0));
        let before = cam.y_tangent();
        let mut input = CameraInput::default();
        input.analog.accumulate(0.0, 0.0, 1.0);
        cam.update(DT, &target_at(Vec3::ZERO), &mut input, &no_hits, &ObstructAll);
        assert!((cam.y_tangent() - before * 0.3f32.exp()).abs() < 1e-5);
        assert_eq!(input.analog, AnalogDeltas::default());
    }

    #[test]
    fn test_analog_orbit_while_dragging() {
        let config = CameraConfig {
            mode: CameraMode::FreeOrbit,
            analog_orbit: AnalogOrbit::WhileDragging,
            ..Default::default()
        };
        let offset = Vec3::new(0.0, 0.0, -5.0);
        let mut cam = ChaseCamera::new(config, offset).unwrap();
        let target = target_at(Vec3::ZERO);

        let mut input = CameraInput::default();
        input.analog.accumulate(0.0, 0.5, 0.0);
        cam.update(DT, &target, &mut input, &no_hits, &ObstructAll);
        assert!((cam.offset() - offset).length() < 1e-4);
        assert_eq!(input.analog, AnalogDeltas::default());

        let mut input =
            CameraInput::with_signals(SignalSet::DRAG_TO_ORBIT);
        input.analog.accumulate(0.0, 0.5, 0.0);
        cam.update(DT, &target, &mut input, &no_hits, &ObstructAll);
        assert!(cam.offset().x < -0.1);
    }

    #[test]
    fn test_steady_chase_tracks_target() {
        let offset = Vec3::new(0.0, 2.0, -5.0);
        let mut cam = camera(offset);
        let start = Vec3::new(10.0, 0.0, 3.0);
        let velocity = Vec3::X;

        let first = cam.update(
            0.0,
            &target_at(start),
            &mut CameraInput::default(),
            &no_hits,
            &ObstructAll,
        );
        let mut pose = first;
        let mut point = start;
        for _ in 0..60 {
            point += velocity * DT;
            pose = cam.update(
                DT,
                &target_at(point),
                &mut CameraInput::default(),
                &no_hits,
                &ObstructAll,
            );
        }

        assert!((pose.position - first.position - Vec3::X).length() < 1e-4);
        assert!((cam.offset() - offset).length() < 1e-4);
        assert!((cam.range() - offset.length()).abs() < 1e-4);
    }

    #[test]
    fn test_frustum_follows_zoom() {
        let mut cam = camera(Vec3::new(0.0, 2.0, -5.0));
        cam.set_y_tangent(1.0);
        let frustum = cam.frustum(1.5);
        assert!((frustum.y_tangent() - 1.0).abs() < 1e-6);
        assert!((frustum.right - 1.5 * frustum.top).abs() < 1e-6);
        cam.set_y_tangent(100.0);
        assert!((cam.y_tangent() - cam.config().max_y_tangent).abs() < 1e-6);
    }

    #[test]
    fn test_pose_rotation_matches_look() {
        let mut cam = camera(Vec3::new(0.0, 2.0, -5.0));
        let pose = cam.update(
            DT,
            &target_at(Vec3::ZERO),
            &mut CameraInput::default(),
            &no_hits,
            &ObstructAll,
        );
        assert!((pose.rotation * Vec3::NEG_Z - pose.look_direction).length() < 1e-5);
    }

    fn signal_set() -> impl Strategy<Value = SignalSet> {
        any::<u16>().prop_map(SignalSet::from_bits_truncate)
    }

    fn vec3(range: f32) -> impl Strategy<Value = Vec3> {
        (-range..range, -range..range, -range..range).prop_map(|(x, y, z)| Vec3::new(x, y, z))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        #[test]
        fn prop_look_direction_is_unit(
            offset in vec3(50.0).prop_filter("non-zero offset", |v| v.length() > 0.01),
            point in vec3(1000.0),
            forward in vec3(1.0),
            signals in signal_set(),
            pitch in -0.5f32..0.5,
            yaw in -0.5f32..0.5,
            zoom in -2.0f32..2.0,
            free in any::<bool>(),
        ) {
            let mut cam = if free { free_orbit(offset) } else { camera(offset) };
            let target = TargetState { point, forward, body: BodyHandle(1) };
            let mut input = CameraInput::with_signals(signals);
            input.analog.accumulate(pitch, yaw, zoom);
            let pose = cam.update(DT, &target, &mut input, &no_hits, &ObstructAll);

            prop_assert!((pose.look_direction.length() - 1.0).abs() < 1e-4);
            prop_assert!(cam.offset().length() > 0.0);
            prop_assert!(cam.y_tangent() >= cam.config().min_y_tangent);
            prop_assert!(cam.y_tangent() <= cam.config().max_y_tangent);
        }

        #[test]
        fn prop_up_avoidance_near_vertical(
            polar in 0.0f32..=0.01,
            bearing in -std::f32::consts::PI..std::f32::consts::PI,
            range in 1.0f32..50.0,
            below in any::<bool>(),
            free in any::<bool>(),
        ) {
            let vertical = if below { -polar.cos() } else { polar.cos() };
            let offset = Vec3::new(
                polar.sin() * bearing.sin(),
                vertical,
                polar.sin() * bearing.cos(),
            ) * range;
            let mut cam = if free { free_orbit(offset) } else { camera(offset) };
            let pose = cam.update(
                DT,
                &target_at(Vec3::ZERO),
                &mut CameraInput::default(),
                &no_hits,
                &ObstructAll,
            );

            let max_dot = cam.config().up_avoid_angle.cos();
            prop_assert!(pose.look_direction.is_finite());
            prop_assert!(pose.look_direction.dot(WORLD_UP).abs() <= max_dot + 1e-6);
        }

        #[test]
        fn prop_obstruction_sets_range(
            offset in vec3(20.0).prop_filter("usable offset", |v| v.length() > 1.0),
            fraction in 0.01f32..1.0,
            extra in proptest::collection::vec(0.0f32..1.0, 0..4),
        ) {
            let mut cam = free_orbit(offset);
            let ray_range = offset.length();
            let nearest = extra.iter().copied().fold(fraction, f32::min);
            let world = |_from: Vec3, _to: Vec3| {
                std::iter::once(fraction)
                    .chain(extra.iter().copied())
                    .enumerate()
                    .map(|(i, fraction)| RayHit {
                        fraction,
                        body: BodyHandle(10 + i as u64),
                        normal: Vec3::Y,
                    })
                    .collect::<Vec<_>>()
            };
            let target = target_at(Vec3::ZERO);
            cam.update(DT, &target, &mut CameraInput::default(), &world, &ObstructAll);
            prop_assert!((cam.range() - (ray_range * nearest).max(MIN_RANGE)).abs() < 1e-3);

            let mut xray = free_orbit(offset);
            let mut input = CameraInput::with_signals(SignalSet::XRAY);
            xray.update(DT, &target, &mut input, &world, &ObstructAll);
            prop_assert!((xray.range() - ray_range).abs() < 1e-3);
        }
    }
}
