use super::{SurfaceHit, SurfaceRaycast};
use bevy::picking::mesh_picking::ray_cast::{MeshRayCast, MeshRayCastSettings};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Marks geometry the ruler may snap to when the scope is [`RaycastScope::Measurable`].
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Measurable;

/// Which meshes take part in pick queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaycastScope {
    /// Every visible mesh in the scene.
    #[default]
    Scene,
    /// Only entities carrying [`Measurable`].
    Measurable,
}

/// Closest-hit queries against scene meshes through Bevy's [`MeshRayCast`].
///
/// Borrowed for the duration of one system run; the entity filter decides
/// which meshes are eligible (overlay geometry must always be excluded).
pub struct MeshSurfaceRaycast<'a, 'w, 's> {
    ray_cast: &'a mut MeshRayCast<'w, 's>,
    filter: &'a dyn Fn(Entity) -> bool,
}

impl<'a, 'w, 's> MeshSurfaceRaycast<'a, 'w, 's> {
    pub fn new(ray_cast: &'a mut MeshRayCast<'w, 's>, filter: &'a dyn Fn(Entity) -> bool) -> Self {
        Self { ray_cast, filter }
    }
}

impl SurfaceRaycast for MeshSurfaceRaycast<'_, '_, '_> {
    fn closest_hit(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<SurfaceHit> {
        let direction = Dir3::new(direction).ok()?;
        let settings = MeshRayCastSettings {
            filter: self.filter,
            ..MeshRayCastSettings::default()
        };

        let (_, hit) = self
            .ray_cast
            .cast_ray(Ray3d::new(origin, direction), &settings)
            .first()?;

        (hit.distance <= max_distance).then_some(SurfaceHit {
            position: hit.point,
            normal: hit.normal,
            distance: hit.distance,
        })
    }
}
