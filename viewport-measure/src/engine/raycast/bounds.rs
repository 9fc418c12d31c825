use super::{SurfaceHit, SurfaceRaycast};
use bevy::prelude::*;

/// Slab-method ray/AABB intersection.
///
/// Returns the entry distance (or exit distance when the origin is inside the
/// box) in units of `ray_direction`, together with the axis the ray crossed.
pub fn ray_aabb_hit_t(
    ray_origin: Vec3,
    ray_direction: Vec3,
    min: Vec3,
    max: Vec3,
) -> Option<(f32, Vec3)> {
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut enter_normal = Vec3::ZERO;
    let mut exit_normal = Vec3::ZERO;

    for axis in 0..3 {
        let origin = ray_origin[axis];
        let dir = ray_direction[axis];
        let mut unit = Vec3::ZERO;
        unit[axis] = 1.0;

        if dir == 0.0 {
            // Parallel to this slab: must already lie between its planes.
            if origin < min[axis] || origin > max[axis] {
                return None;
            }
            continue;
        }

        let inv = 1.0 / dir;
        let (mut t0, mut t1) = ((min[axis] - origin) * inv, (max[axis] - origin) * inv);
        // Entering through the min plane means facing -axis.
        let (mut n0, mut n1) = (-unit, unit);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
            std::mem::swap(&mut n0, &mut n1);
        }

        if t0 > t_enter {
            t_enter = t0;
            enter_normal = n0;
        }
        if t1 < t_exit {
            t_exit = t1;
            exit_normal = n1;
        }
        if t_enter > t_exit {
            return None;
        }
    }

    if t_exit < 0.0 {
        return None;
    }
    if t_enter >= 0.0 {
        Some((t_enter, enter_normal))
    } else {
        Some((t_exit, -exit_normal))
    }
}

/// Axis-aligned boxes answering closest-hit queries without any mesh data.
#[derive(Debug, Clone, Default)]
pub struct BoxSceneRaycast {
    boxes: Vec<(Vec3, Vec3)>,
}

impl BoxSceneRaycast {
    pub fn add_box(&mut self, min: Vec3, max: Vec3) {
        self.boxes.push((min.min(max), min.max(max)));
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

impl SurfaceRaycast for BoxSceneRaycast {
    fn closest_hit(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<SurfaceHit> {
        let dir = direction.try_normalize()?;

        self.boxes
            .iter()
            .filter_map(|(min, max)| ray_aabb_hit_t(origin, dir, *min, *max))
            .filter(|(t, _)| *t <= max_distance)
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(t, normal)| SurfaceHit {
                position: origin + dir * t,
                normal,
                distance: t,
            })
    }
}

/// Infinite horizontal plane at a fixed height.
#[derive(Debug, Clone, Copy)]
pub struct GroundPlaneRaycast {
    pub height: f32,
}

impl GroundPlaneRaycast {
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

impl SurfaceRaycast for GroundPlaneRaycast {
    fn closest_hit(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<SurfaceHit> {
        let dir = direction.try_normalize()?;
        if dir.y.abs() < 0.001 {
            return None;
        }

        let t = (self.height - origin.y) / dir.y;
        if t <= 0.0 || t > max_distance {
            return None;
        }

        Some(SurfaceHit {
            position: origin + dir * t,
            normal: if dir.y < 0.0 { Vec3::Y } else { Vec3::NEG_Y },
            distance: t,
        })
    }
}
