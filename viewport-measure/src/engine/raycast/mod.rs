//! Screen-to-world pick rays and the closest-hit query boundary.
//!
//! The tool never builds acceleration structures itself. It turns a cursor
//! position into a world-space ray and asks a [`SurfaceRaycast`] collaborator
//! for the nearest surface along it.

/// Slab-method box and ground-plane collaborators.
pub mod bounds;

/// Collaborator backed by Bevy's mesh ray casting.
pub mod mesh;

use crate::engine::camera::viewport::ViewportGeometry;
use crate::error::{NoRayReason, PickError, PickResult};
use bevy::prelude::*;

/// World-space pick ray. `direction` is not required to be unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickRay {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl PickRay {
    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction.normalize_or_zero() * distance
    }
}

/// Answer from a closest-hit query. `distance` is measured in world units
/// from the ray origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub position: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

/// Uniform hit/no-hit outcome of [`intersect`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitResult {
    Hit(SurfaceHit),
    Miss,
}

impl HitResult {
    pub fn position(&self) -> Option<Vec3> {
        match self {
            Self::Hit(hit) => Some(hit.position),
            Self::Miss => None,
        }
    }
}

/// Nearest-surface intersection engine.
///
/// Implementations own their acceleration structures and answer synchronously.
pub trait SurfaceRaycast {
    /// Closest surface hit along `direction` from `origin`, no further than `max_distance`.
    fn closest_hit(&mut self, origin: Vec3, direction: Vec3, max_distance: f32)
    -> Option<SurfaceHit>;
}

/// Camera-to-world matrices needed to unproject a click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    pub view_from_world: Mat4,
    pub clip_from_view: Mat4,
}

impl CameraMatrices {
    pub fn new(view_from_world: Mat4, clip_from_view: Mat4) -> Self {
        Self {
            view_from_world,
            clip_from_view,
        }
    }

    /// Read the matrices of a Bevy camera without caring which projection it uses.
    pub fn from_camera(camera: &Camera, camera_transform: &GlobalTransform) -> Self {
        Self {
            view_from_world: camera_transform.compute_matrix().inverse(),
            clip_from_view: camera.clip_from_view(),
        }
    }
}

/// Unproject a normalized device coordinate into a world-space ray.
///
/// The view matrix is inverted to recover the camera position and forward
/// axis. Two depths are unprojected through the inverse projection so the
/// same code serves perspective and orthographic cameras, with either depth
/// convention; the forward axis fixes the ray orientation. The origin is the
/// point of that line on the camera plane.
pub fn compute_ray(ndc: Vec2, matrices: &CameraMatrices) -> Result<PickRay, NoRayReason> {
    if !ndc.is_finite() || ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 {
        return Err(NoRayReason::OutsideNdc);
    }

    if matrices.view_from_world.determinant().abs() <= f32::EPSILON
        || matrices.clip_from_view.determinant().abs() <= f32::EPSILON
    {
        return Err(NoRayReason::DegenerateCamera);
    }

    let world_from_view = matrices.view_from_world.inverse();
    let view_from_clip = matrices.clip_from_view.inverse();
    let camera_position = world_from_view.w_axis.truncate();
    let camera_forward = -world_from_view.z_axis.truncate();

    let unproject = |depth: f32| -> Option<Vec3> {
        let view = view_from_clip * Vec4::new(ndc.x, ndc.y, depth, 1.0);
        if view.w.abs() <= f32::EPSILON {
            return None;
        }
        let world = world_from_view.transform_point3(view.truncate() / view.w);
        world.is_finite().then_some(world)
    };

    let (Some(a), Some(b)) = (unproject(1.0), unproject(0.5)) else {
        return Err(NoRayReason::DegenerateCamera);
    };

    let mut direction = b - a;
    if direction.length_squared() <= f32::EPSILON * f32::EPSILON {
        return Err(NoRayReason::DegenerateCamera);
    }
    if direction.dot(camera_forward) < 0.0 {
        direction = -direction;
    }

    // Camera plane: the eye for perspective, the view rectangle for orthographic.
    let unit = direction.normalize();
    let origin = a + unit * (camera_position - a).dot(unit);

    Ok(PickRay { origin, direction })
}

/// Ask the collaborator for the closest hit and normalize its answer.
///
/// Hits at or behind the origin, and hits reported beyond `max_distance`,
/// count as a miss.
pub fn intersect<R: SurfaceRaycast + ?Sized>(
    ray: &PickRay,
    max_distance: f32,
    raycast: &mut R,
) -> HitResult {
    let Some(hit) = raycast.closest_hit(ray.origin, ray.direction, max_distance) else {
        return HitResult::Miss;
    };

    if !(hit.distance > 0.0) {
        return HitResult::Miss;
    }
    if hit.distance > max_distance {
        warn!(
            "[RULER] raycast returned hit at {} beyond limit {}, ignoring",
            hit.distance, max_distance
        );
        return HitResult::Miss;
    }

    HitResult::Hit(hit)
}

/// Full click path: cursor → NDC → ray → closest surface.
pub fn pick_surface_point<R: SurfaceRaycast + ?Sized>(
    cursor: Vec2,
    geometry: &ViewportGeometry,
    matrices: &CameraMatrices,
    max_distance: f32,
    raycast: &mut R,
) -> PickResult<SurfaceHit> {
    let ndc = geometry.cursor_to_ndc(cursor).map_err(PickError::NoRay)?;
    let ray = compute_ray(ndc, matrices).map_err(PickError::NoRay)?;

    match intersect(&ray, max_distance, raycast) {
        HitResult::Hit(hit) => Ok(hit),
        HitResult::Miss => Err(PickError::NoHit),
    }
}

#[cfg(test)]
mod tests {
    use super::bounds::{BoxSceneRaycast, GroundPlaneRaycast};
    use super::*;

    fn looking_down_z() -> CameraMatrices {
        CameraMatrices::new(
            Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y),
            Mat4::perspective_infinite_reverse_rh(std::f32::consts::FRAC_PI_4, 1.0, 0.1),
        )
    }

    struct FixedHit(Option<SurfaceHit>);

    impl SurfaceRaycast for FixedHit {
        fn closest_hit(&mut self, _: Vec3, _: Vec3, _: f32) -> Option<SurfaceHit> {
            self.0
        }
    }

    #[test]
    fn centre_ray_follows_camera_forward() {
        let ray = compute_ray(Vec2::ZERO, &looking_down_z()).unwrap();
        let dir = ray.direction.normalize();
        assert!((dir - Vec3::NEG_Z).length() < 1e-4, "{dir:?}");
        assert!((ray.origin - Vec3::new(0.0, 0.0, 10.0)).length() < 1e-3, "{:?}", ray.origin);
    }

    #[test]
    fn off_centre_ray_leans_towards_cursor() {
        let ray = compute_ray(Vec2::new(1.0, 0.0), &looking_down_z()).unwrap();
        assert!(ray.direction.x > 0.0);
        assert!(ray.direction.z < 0.0);
        assert!(ray.direction.y.abs() < 1e-5);
    }

    #[test]
    fn conventional_depth_range_gives_same_orientation() {
        let matrices = CameraMatrices::new(
            Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y),
            Mat4::perspective_rh_gl(std::f32::consts::FRAC_PI_4, 1.0, 0.1, 100.0),
        );
        let ray = compute_ray(Vec2::ZERO, &matrices).unwrap();
        assert!((ray.direction.normalize() - Vec3::NEG_Z).length() < 1e-4);
        assert!((ray.origin.z - 10.0).abs() < 1e-3, "{:?}", ray.origin);
    }

    #[test]
    fn surface_just_past_near_plane_is_hit_with_conventional_depth() {
        let matrices = CameraMatrices::new(
            Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y),
            Mat4::perspective_rh_gl(std::f32::consts::FRAC_PI_4, 1.0, 0.1, 100.0),
        );
        let mut scene = BoxSceneRaycast::default();
        scene.add_box(Vec3::new(-1.0, -1.0, 9.0), Vec3::new(1.0, 1.0, 9.8));

        let geometry = ViewportGeometry::new(Vec2::new(600.0, 600.0));
        let hit = pick_surface_point(
            Vec2::new(300.0, 300.0),
            &geometry,
            &matrices,
            1.0e9,
            &mut scene,
        )
        .unwrap();

        assert!((hit.position.z - 9.8).abs() < 1e-3, "{hit:?}");
        assert!((hit.distance - 0.2).abs() < 1e-3, "{hit:?}");
    }

    #[test]
    fn orthographic_rays_are_parallel() {
        let matrices = CameraMatrices::new(
            Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y),
            Mat4::orthographic_rh(-5.0, 5.0, -5.0, 5.0, 0.1, 100.0),
        );
        let a = compute_ray(Vec2::new(-1.0, 0.0), &matrices).unwrap();
        let b = compute_ray(Vec2::new(1.0, 0.0), &matrices).unwrap();
        assert!((a.direction.normalize() - b.direction.normalize()).length() < 1e-5);
        assert!((a.origin.x + 5.0).abs() < 1e-4);
        assert!((b.origin.x - 5.0).abs() < 1e-4);
    }

    #[test]
    fn out_of_range_ndc_has_no_ray() {
        let matrices = looking_down_z();
        assert_eq!(
            compute_ray(Vec2::new(1.01, 0.0), &matrices),
            Err(NoRayReason::OutsideNdc)
        );
        assert_eq!(
            compute_ray(Vec2::new(0.0, f32::NAN), &matrices),
            Err(NoRayReason::OutsideNdc)
        );
    }

    #[test]
    fn singular_camera_has_no_ray() {
        let matrices = CameraMatrices::new(Mat4::ZERO, Mat4::IDENTITY);
        assert_eq!(
            compute_ray(Vec2::ZERO, &matrices),
            Err(NoRayReason::DegenerateCamera)
        );
    }

    #[test]
    fn intersect_discards_hits_outside_range() {
        let ray = PickRay {
            origin: Vec3::ZERO,
            direction: Vec3::X,
        };
        let hit = |distance| SurfaceHit {
            position: Vec3::X * distance,
            normal: Vec3::NEG_X,
            distance,
        };

        assert_eq!(intersect(&ray, 10.0, &mut FixedHit(None)), HitResult::Miss);
        assert_eq!(intersect(&ray, 10.0, &mut FixedHit(Some(hit(0.0)))), HitResult::Miss);
        assert_eq!(intersect(&ray, 10.0, &mut FixedHit(Some(hit(11.0)))), HitResult::Miss);
        assert_eq!(
            intersect(&ray, 10.0, &mut FixedHit(Some(hit(4.0)))),
            HitResult::Hit(hit(4.0))
        );
    }

    #[test]
    fn pick_hits_box_in_front_of_camera() {
        let mut scene = BoxSceneRaycast::default();
        scene.add_box(Vec3::splat(-1.0), Vec3::splat(1.0));

        let geometry = ViewportGeometry::new(Vec2::new(600.0, 600.0));
        let hit = pick_surface_point(
            Vec2::new(300.0, 300.0),
            &geometry,
            &looking_down_z(),
            1.0e9,
            &mut scene,
        )
        .unwrap();

        assert!((hit.position - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-3, "{hit:?}");
        assert!((hit.normal - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn pick_reports_no_ray_and_no_hit_separately() {
        let geometry = ViewportGeometry::new(Vec2::new(600.0, 600.0));
        let matrices = looking_down_z();

        let outside = pick_surface_point(
            Vec2::new(700.0, 300.0),
            &geometry,
            &matrices,
            1.0e9,
            &mut BoxSceneRaycast::default(),
        );
        assert_eq!(outside, Err(PickError::NoRay(NoRayReason::OutsideWindow)));

        let empty = pick_surface_point(
            Vec2::new(300.0, 300.0),
            &geometry,
            &matrices,
            1.0e9,
            &mut BoxSceneRaycast::default(),
        );
        assert_eq!(empty, Err(PickError::NoHit));
    }

    #[test]
    fn ground_plane_pick_from_above() {
        let matrices = CameraMatrices::new(
            Mat4::look_at_rh(Vec3::new(0.0, 10.0, 0.01), Vec3::ZERO, Vec3::Y),
            Mat4::perspective_infinite_reverse_rh(std::f32::consts::FRAC_PI_4, 1.0, 0.1),
        );
        let geometry = ViewportGeometry::new(Vec2::new(100.0, 100.0));
        let hit = pick_surface_point(
            Vec2::new(50.0, 50.0),
            &geometry,
            &matrices,
            100.0,
            &mut GroundPlaneRaycast::new(0.0),
        )
        .unwrap();
        assert!(hit.position.y.abs() < 1e-4);
        assert!(hit.position.xz().length() < 1e-2);
    }
}
