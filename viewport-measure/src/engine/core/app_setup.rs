use bevy::asset::AssetMetaCheck;
use bevy::picking::mesh_picking::ray_cast::{MeshRayCast, MeshRayCastSettings};
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::render::view::RenderLayers;
use bevy::window::PrimaryWindow;
use constants::render_settings::MEASURE_RENDER_LAYER;

use crate::engine::camera::viewport_camera::{ViewportCamera, camera_controller};
use crate::engine::core::settings::SettingsPlugin;
use crate::engine::core::window_config::create_window_config;
use crate::engine::raycast::mesh::Measurable;
use crate::rpc::web_rpc::WebRpcPlugin;
use crate::tools::presenter::RulerRenderPlugin;
use crate::tools::ruler::{MeasurementToolPlugin, RulerManipulator};
use crate::tools::tool_manager::ScenePicking;

/// Log filter for the viewer; ruler, tool and RPC messages are tagged
/// `[RULER]`, `[TOOL]` and `[RPC]`.
pub const LOG_FILTER: &str = "wgpu=error,naga=warn,viewport_measure=debug";

pub fn create_app() -> App {
    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        .add_plugins(SettingsPlugin)
        .add_plugins(MeasurementToolPlugin)
        .add_plugins(RulerRenderPlugin)
        .add_plugins(WebRpcPlugin)
        .insert_resource(ClearColor(Color::srgb(0.08, 0.08, 0.1)))
        .init_resource::<ViewportCamera>();

    app.init_resource::<SceneSelection>()
        .add_systems(Startup, setup)
        .add_systems(
            Update,
            (
                camera_controller,
                select_scene_object.run_if(scene_picking_enabled),
            ),
        );

    app
}

/// Object picked by the viewer's default click selection.
#[derive(Resource, Default, Debug)]
pub struct SceneSelection {
    pub selected: Option<Entity>,
}

fn scene_picking_enabled(picking: Res<ScenePicking>) -> bool {
    picking.enabled
}

/// Default left-click selection. Suspended while a ruler captures clicks.
fn select_scene_object(
    mouse: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<Camera3d>>,
    measurable: Query<(), With<Measurable>>,
    mut ray_cast: MeshRayCast,
    mut selection: ResMut<SceneSelection>,
) {
    if !mouse.just_pressed(MouseButton::Left) {
        return;
    }
    let (Ok(window), Ok((camera, camera_transform))) = (windows.single(), cameras.single()) else {
        return;
    };
    let Some(ray) = window
        .cursor_position()
        .and_then(|cursor| camera.viewport_to_world(camera_transform, cursor).ok())
    else {
        return;
    };

    let filter = |entity: Entity| measurable.contains(entity);
    let settings = MeshRayCastSettings::default().with_filter(&filter);
    selection.selected = ray_cast.cast_ray(ray, &settings).first().map(|(e, _)| *e);
    debug!("[TOOL] scene selection: {:?}", selection.selected);
}

fn spawn_lighting(commands: &mut Commands) {
    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::ZYX,
            0.0,
            1.0,
            -std::f32::consts::FRAC_PI_4,
        )),
    ));
}

/// Simple geometry to measure against.
fn spawn_demo_scene(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) {
    let ground = materials.add(StandardMaterial {
        base_color: Color::srgb(0.3, 0.32, 0.3),
        perceptual_roughness: 0.9,
        ..default()
    });
    let solid = materials.add(StandardMaterial {
        base_color: Color::srgb(0.55, 0.6, 0.7),
        ..default()
    });

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(20.0, 20.0))),
        MeshMaterial3d(ground),
        Transform::default(),
        Measurable,
    ));

    let boxes = [
        (Vec3::new(-3.0, 1.0, 0.0), Vec3::new(2.0, 2.0, 2.0)),
        (Vec3::new(2.5, 0.5, -2.0), Vec3::new(3.0, 1.0, 1.5)),
        (Vec3::new(0.5, 2.0, -5.0), Vec3::new(1.0, 4.0, 1.0)),
    ];
    for (centre, size) in boxes {
        commands.spawn((
            Mesh3d(meshes.add(Cuboid::from_size(size))),
            MeshMaterial3d(solid.clone()),
            Transform::from_translation(centre),
            Measurable,
        ));
    }

    commands.spawn((
        Mesh3d(meshes.add(Sphere::new(1.0).mesh().uv(32, 18))),
        MeshMaterial3d(solid),
        Transform::from_xyz(3.0, 1.0, 3.0),
        Measurable,
    ));
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    viewport_camera: Res<ViewportCamera>,
) {
    spawn_lighting(&mut commands);
    spawn_demo_scene(&mut commands, &mut meshes, &mut materials);

    let camera = commands
        .spawn((
            Camera3d::default(),
            viewport_camera.transform(),
            RenderLayers::default().with(MEASURE_RENDER_LAYER),
        ))
        .id();

    commands.spawn(RulerManipulator::with_camera(camera));

    #[cfg(not(target_arch = "wasm32"))]
    {
        create_native_overlays(&mut commands);
    }
}

fn create_native_overlays(commands: &mut Commands) {
    commands.spawn((
        Text::new(
            "R: ruler   G: angle   Esc: off\n\
             Left click: add point   Double click: clear\n\
             Right drag: look   WASD/QE: move",
        ),
        TextFont {
            font_size: 14.0,
            ..default()
        },
        TextColor(Color::srgb(0.85, 0.85, 0.85)),
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(12.0),
            left: Val::Px(12.0),
            ..default()
        },
    ));
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    let log_config = LogPlugin {
        filter: LOG_FILTER.to_string(),
        ..default()
    };

    DefaultPlugins
        .set(window_config)
        .set(asset_config)
        .set(log_config)
}
