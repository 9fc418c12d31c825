use bevy::prelude::*;
use bevy::render::primitives::Aabb;
use bevy::render::view::ViewVisibility;
use bevy::window::{PrimaryWindow, WindowResolution};
use viewport_measure::engine::core::settings::MeasurementSettings;
use viewport_measure::engine::raycast::mesh::{Measurable, RaycastScope};
use viewport_measure::tools::gesture::{GestureEvent, GestureKind};
use viewport_measure::tools::presenter::MeasureOverlay;
use viewport_measure::tools::ruler::{MeasurementToolPlugin, RulerManipulator};
use viewport_measure::tools::tool_manager::{
    ToolRequest, ToolSelectionSource, ToolToggleEvent,
};

const HALF_DEPTH: f32 = 0.1;

/// Three thin slabs stacked along the camera axis, nearest first:
/// an overlay bar, plain scene geometry, then a measurable surface.
const OVERLAY_Z: f32 = 3.0;
const PLAIN_Z: f32 = 2.0;
const MEASURABLE_Z: f32 = 1.0;

/// Headless app using the scene-mesh backend. Without the render plugins
/// nothing computes bounds or view visibility, so slabs get both up front.
fn setup(scope: RaycastScope) -> (App, Entity) {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(MeasurementToolPlugin)
        .insert_resource(Assets::<Mesh>::default());
    app.world_mut()
        .resource_mut::<MeasurementSettings>()
        .raycast_scope = scope;

    app.world_mut().spawn((
        Window {
            resolution: WindowResolution::new(200.0, 200.0),
            ..default()
        },
        PrimaryWindow,
    ));
    let camera = app
        .world_mut()
        .spawn((
            Camera::default(),
            GlobalTransform::from(Transform::from_xyz(0.0, 0.0, 10.0)),
        ))
        .id();
    let ruler = app
        .world_mut()
        .spawn(RulerManipulator::with_camera(camera))
        .id();

    let mesh = app
        .world_mut()
        .resource_mut::<Assets<Mesh>>()
        .add(Cuboid::new(1.0, 1.0, 2.0 * HALF_DEPTH));

    let overlay = spawn_slab(&mut app, &mesh, OVERLAY_Z);
    app.world_mut()
        .entity_mut(overlay)
        .insert(MeasureOverlay { manipulator: ruler });
    spawn_slab(&mut app, &mesh, PLAIN_Z);
    let measurable = spawn_slab(&mut app, &mesh, MEASURABLE_Z);
    app.world_mut().entity_mut(measurable).insert(Measurable);

    app.update();
    app.world_mut().send_event(ToolToggleEvent {
        requested: ToolRequest::Ruler,
        source: ToolSelectionSource::Toolbar,
    });
    app.update();

    (app, ruler)
}

fn spawn_slab(app: &mut App, mesh: &Handle<Mesh>, z: f32) -> Entity {
    let transform = Transform::from_xyz(0.0, 0.0, z);
    let entity = app
        .world_mut()
        .spawn((
            Mesh3d(mesh.clone()),
            transform,
            GlobalTransform::from(transform),
            Aabb::from_min_max(
                Vec3::new(-0.5, -0.5, -HALF_DEPTH),
                Vec3::new(0.5, 0.5, HALF_DEPTH),
            ),
        ))
        .id();
    app.world_mut()
        .get_mut::<ViewVisibility>(entity)
        .unwrap()
        .set();
    entity
}

fn click_centre(app: &mut App, ruler: Entity) -> Vec<Vec3> {
    app.world_mut().send_event(GestureEvent {
        manipulator: ruler,
        kind: GestureKind::Click {
            screen_pos: Vec2::new(100.0, 100.0),
        },
    });
    app.update();
    app.world()
        .get::<RulerManipulator>(ruler)
        .unwrap()
        .model()
        .points()
        .to_vec()
}

#[test]
fn scene_scope_skips_overlay_and_hits_nearest_mesh() {
    let (mut app, ruler) = setup(RaycastScope::Scene);

    let points = click_centre(&mut app, ruler);
    assert_eq!(points.len(), 1);
    assert!(
        (points[0].z - (PLAIN_Z + HALF_DEPTH)).abs() < 1e-3,
        "{points:?}"
    );
}

#[test]
fn measurable_scope_only_hits_marked_meshes() {
    let (mut app, ruler) = setup(RaycastScope::Measurable);

    let points = click_centre(&mut app, ruler);
    assert_eq!(points.len(), 1);
    assert!(
        (points[0].z - (MEASURABLE_Z + HALF_DEPTH)).abs() < 1e-3,
        "{points:?}"
    );
    assert!(points[0].xy().length() < 1e-3);
}
