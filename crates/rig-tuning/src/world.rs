//! Minimal collision world for ray casts.
//!
//! A ground plane plus axis-aligned boxes. Enough to exercise the camera's
//! line-of-sight logic without a physics engine.

use glam::Vec3;
use rand::Rng;
use vehicle_rig::{BodyHandle, RayCastProvider, RayHit};

/// Axis-aligned box obstacle.
#[derive(Clone, Copy, Debug)]
pub struct Obstacle {
    pub body: BodyHandle,
    pub min: Vec3,
    pub max: Vec3,
}

impl Obstacle {
    /// Whether `point` lies more than `margin` inside the box.
    #[must_use]
    pub fn contains(&self, point: Vec3, margin: f32) -> bool {
        point.cmpgt(self.min + margin).all() && point.cmplt(self.max - margin).all()
    }

    /// First entry of the segment `from -> from + delta`, as `(fraction, normal)`.
    ///
    /// Segments starting inside the box do not hit it.
    #[must_use]
    pub fn intersect_segment(&self, from: Vec3, delta: Vec3) -> Option<(f32, Vec3)> {
        const EPSILON: f32 = 1e-8;

        let inv_delta = Vec3::new(
            if delta.x.abs() < EPSILON { 1.0 / EPSILON.copysign(delta.x) } else { 1.0 / delta.x },
            if delta.y.abs() < EPSILON { 1.0 / EPSILON.copysign(delta.y) } else { 1.0 / delta.y },
            if delta.z.abs() < EPSILON { 1.0 / EPSILON.copysign(delta.z) } else { 1.0 / delta.z },
        );

        let t_min = (self.min - from) * inv_delta;
        let t_max = (self.max - from) * inv_delta;
        let t1 = t_min.min(t_max);
        let t2 = t_min.max(t_max);

        let t_near = t1.max_element();
        let t_far = t2.min_element();
        if t_near > t_far || t_near < 0.0 || t_near > 1.0 {
            return None;
        }

        // The entry face is on the axis that entered last.
        let axis = if t_near == t1.x {
            Vec3::X
        } else if t_near == t1.y {
            Vec3::Y
        } else {
            Vec3::Z
        };
        let normal = -axis * delta.dot(axis).signum();
        Some((t_near, normal))
    }
}

/// Ground plane and boxes.
#[derive(Clone, Debug)]
pub struct SimWorld {
    ground_height: Option<f32>,
    obstacles: Vec<Obstacle>,
    next_body: u64,
}

impl SimWorld {
    /// Handle of the ground plane.
    pub const GROUND: BodyHandle = BodyHandle(0);
    /// First handle given to boxes; lower handles are free for vehicles.
    const FIRST_OBSTACLE: u64 = 100;

    /// World with a ground plane at `y = 0`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ground_height: Some(0.0),
            obstacles: Vec::new(),
            next_body: Self::FIRST_OBSTACLE,
        }
    }

    /// World with no ground.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ground_height: None,
            ..Self::new()
        }
    }

    /// Add a box and return its handle.
    pub fn add_box(&mut self, center: Vec3, half_extents: Vec3) -> BodyHandle {
        let body = BodyHandle(self.next_body);
        self.next_body += 1;
        let half_extents = half_extents.abs();
        self.obstacles.push(Obstacle {
            body,
            min: center - half_extents,
            max: center + half_extents,
        });
        body
    }

    /// Scatter up to `count` boxes standing on the ground within `radius` of
    /// `center`, skipping any box `is_clear(center, half_extents)` rejects.
    ///
    /// Returns how many boxes were placed.
    pub fn scatter_boxes(
        &mut self,
        rng: &mut impl Rng,
        count: usize,
        center: Vec3,
        radius: f32,
        is_clear: impl Fn(Vec3, Vec3) -> bool,
    ) -> usize {
        const ATTEMPTS_PER_BOX: usize = 100;

        let mut placed = 0;
        for _ in 0..count * ATTEMPTS_PER_BOX {
            if placed == count {
                break;
            }
            let x = rng.random_range(-radius..radius);
            let z = rng.random_range(-radius..radius);
            if x.hypot(z) > radius {
                continue;
            }
            let half_extents = Vec3::new(
                rng.random_range(0.5..2.0),
                rng.random_range(1.0..4.0),
                rng.random_range(0.5..2.0),
            );
            let box_center = Vec3::new(center.x + x, half_extents.y, center.z + z);
            if !is_clear(box_center, half_extents) {
                continue;
            }
            self.add_box(box_center, half_extents);
            placed += 1;
        }
        if placed < count {
            tracing::warn!("Only found room for {placed} of {count} obstacles");
        }
        placed
    }

    #[must_use]
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl RayCastProvider for SimWorld {
    fn cast_ray(&self, from: Vec3, to: Vec3) -> Vec<RayHit> {
        let delta = to - from;
        let mut hits: Vec<RayHit> = self
            .obstacles
            .iter()
            .filter_map(|obstacle| {
                obstacle
                    .intersect_segment(from, delta)
                    .map(|(fraction, normal)| RayHit {
                        fraction,
                        body: obstacle.body,
                        normal,
                    })
            })
            .collect();

        if let Some(height) = self.ground_height {
            // Only rays coming down through the plane hit it.
            if from.y >= height && to.y < height {
                hits.push(RayHit {
                    fraction: (from.y - height) / (from.y - to.y),
                    body: Self::GROUND,
                    normal: Vec3::Y,
                });
            }
        }

        hits.sort_by(|a, b| a.fraction.total_cmp(&b.fraction));
        hits
    }
}
