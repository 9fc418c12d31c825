use crate::engine::core::settings::MeasurementSettings;
use crate::tools::measure::MeasurementModel;
use crate::tools::ruler::{MeasureSet, RulerManipulator, measurement_camera};
use bevy::prelude::*;
use bevy::render::view::RenderLayers;
use constants::render_settings::{
    DRAW_LINE_WIDTH, DRAW_VERTEX_SIZE, LABEL_COLOUR, MEASURE_RENDER_LAYER, SEGMENT_COLOUR,
    SEGMENT_EMISSIVE, VERTEX_COLOUR, VERTEX_EMISSIVE,
};

/// Text shown for a reported distance: `"5.0 cm"`, `"1.414 cm"`.
pub fn format_distance(distance: f32, unit: &str) -> String {
    let mut text = distance.to_string();
    if distance.is_finite() && !text.contains('.') {
        text.push_str(".0");
    }
    if unit.is_empty() {
        text
    } else {
        format!("{text} {unit}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentLabel {
    pub segment: usize,
    /// World-space midpoint the label is attached to.
    pub anchor: Vec3,
    pub distance: f32,
    pub text: String,
}

/// What a ruler should currently draw, derived from its model.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct RulerPresentation {
    /// Picked points in order; drawn as an open polyline.
    pub polyline: Vec<Vec3>,
    pub labels: Vec<SegmentLabel>,
    /// Model revision this presentation was built from.
    pub revision: Option<u64>,
}

impl RulerPresentation {
    pub fn present(model: &MeasurementModel, unit: &str) -> Self {
        let labels = model
            .segments()
            .into_iter()
            .map(|segment| SegmentLabel {
                segment: segment.index,
                anchor: segment.midpoint,
                distance: segment.distance,
                text: format_distance(segment.distance, unit),
            })
            .collect();

        Self {
            polyline: model.points().to_vec(),
            labels,
            revision: Some(model.revision()),
        }
    }
}

/// Host redraw hook: the ruler's presentation changed and must be drawn again.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RulerRedrawRequest {
    pub manipulator: Entity,
}

/// Rebuild presentations whose model moved on and ask for a redraw.
///
/// At most one request per manipulator per frame, however many mutations
/// happened.
pub fn refresh_ruler_presentation(
    settings: Res<MeasurementSettings>,
    mut manipulators: Query<(Entity, &RulerManipulator, &mut RulerPresentation)>,
    mut redraws: EventWriter<RulerRedrawRequest>,
) {
    let force = settings.is_changed();
    for (entity, manipulator, mut presentation) in &mut manipulators {
        let model = manipulator.model();
        if !force && presentation.revision == Some(model.revision()) {
            continue;
        }
        *presentation = RulerPresentation::present(model, &settings.unit_suffix);
        redraws.write(RulerRedrawRequest {
            manipulator: entity,
        });
    }
}

/// Marks every entity drawn for a ruler. Excluded from pick queries.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureOverlay {
    pub manipulator: Entity,
}

/// Screen-space distance label following a world anchor.
#[derive(Component, Debug, Clone, Copy)]
pub struct SegmentLabelNode {
    pub anchor: Vec3,
}

#[derive(Resource)]
pub struct RulerDrawAssets {
    segment_mesh: Handle<Mesh>,
    vertex_mesh: Handle<Mesh>,
    segment_material: Handle<StandardMaterial>,
    vertex_material: Handle<StandardMaterial>,
}

fn setup_ruler_draw_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // Unit length along X, stretched per segment.
    let segment_mesh = meshes.add(Cuboid::new(1.0, DRAW_LINE_WIDTH, DRAW_LINE_WIDTH));
    let vertex_mesh = meshes.add(Sphere::new(DRAW_VERTEX_SIZE));

    let segment_material = materials.add(StandardMaterial {
        base_color: SEGMENT_COLOUR,
        emissive: SEGMENT_EMISSIVE,
        unlit: true,
        ..default()
    });
    let vertex_material = materials.add(StandardMaterial {
        base_color: VERTEX_COLOUR,
        emissive: VERTEX_EMISSIVE,
        unlit: true,
        ..default()
    });

    commands.insert_resource(RulerDrawAssets {
        segment_mesh,
        vertex_mesh,
        segment_material,
        vertex_material,
    });
}

/// Transform stretching the unit segment mesh from `start` to `end`.
pub fn segment_transform(start: Vec3, end: Vec3) -> Option<Transform> {
    let direction = end - start;
    let length = direction.length();
    if length <= f32::EPSILON {
        return None;
    }

    Some(
        Transform::from_translation((start + end) * 0.5)
            .with_rotation(Quat::from_rotation_arc(Vec3::X, direction / length))
            .with_scale(Vec3::new(length, 1.0, 1.0)),
    )
}

/// Replace a ruler's overlay with geometry for its current presentation.
pub fn redraw_ruler_geometry(
    mut commands: Commands,
    mut requests: EventReader<RulerRedrawRequest>,
    assets: Res<RulerDrawAssets>,
    settings: Res<MeasurementSettings>,
    presentations: Query<&RulerPresentation>,
    overlays: Query<(Entity, &MeasureOverlay)>,
) {
    let mut pending: Vec<Entity> = requests.read().map(|r| r.manipulator).collect();
    pending.sort_unstable();
    pending.dedup();

    for manipulator in pending {
        // Gone rulers are left to the orphan cleanup.
        let Ok(presentation) = presentations.get(manipulator) else {
            continue;
        };
        for (entity, overlay) in &overlays {
            if overlay.manipulator == manipulator {
                commands.entity(entity).despawn();
            }
        }

        let marker = MeasureOverlay { manipulator };
        let layer = RenderLayers::layer(MEASURE_RENDER_LAYER);

        for point in &presentation.polyline {
            commands.spawn((
                Mesh3d(assets.vertex_mesh.clone()),
                MeshMaterial3d(assets.vertex_material.clone()),
                Transform::from_translation(*point),
                marker,
                layer.clone(),
            ));
        }

        for pair in presentation.polyline.windows(2) {
            let Some(transform) = segment_transform(pair[0], pair[1]) else {
                continue;
            };
            commands.spawn((
                Mesh3d(assets.segment_mesh.clone()),
                MeshMaterial3d(assets.segment_material.clone()),
                transform,
                marker,
                layer.clone(),
            ));
        }

        for label in &presentation.labels {
            commands.spawn((
                Text::new(label.text.clone()),
                TextFont {
                    font_size: settings.label_font_size,
                    ..default()
                },
                TextColor(LABEL_COLOUR),
                Node {
                    position_type: PositionType::Absolute,
                    ..default()
                },
                // Shown once placed on screen.
                Visibility::Hidden,
                SegmentLabelNode {
                    anchor: label.anchor,
                },
                marker,
            ));
        }

        debug!(
            "[RULER] redrew {} points, {} labels",
            presentation.polyline.len(),
            presentation.labels.len()
        );
    }
}

/// Keep labels centred above their anchors at a constant screen size.
pub fn place_segment_labels(
    settings: Res<MeasurementSettings>,
    manipulators: Query<&RulerManipulator>,
    cameras: Query<(Entity, &Camera, &GlobalTransform)>,
    mut labels: Query<(
        &SegmentLabelNode,
        &MeasureOverlay,
        &ComputedNode,
        &mut Node,
        &mut Visibility,
    )>,
) {
    for (label, overlay, computed, mut node, mut visibility) in &mut labels {
        let projected = manipulators
            .get(overlay.manipulator)
            .ok()
            .and_then(|manipulator| measurement_camera(manipulator, &cameras))
            .and_then(|(camera, transform)| camera.world_to_viewport(transform, label.anchor).ok());

        let Some(screen) = projected else {
            // Behind the camera or no camera at all.
            *visibility = Visibility::Hidden;
            continue;
        };

        let size = computed.size() * computed.inverse_scale_factor();
        node.left = Val::Px(screen.x - size.x * 0.5);
        node.top = Val::Px(screen.y - size.y - settings.label_offset_px);
        *visibility = Visibility::Inherited;
    }
}

/// Remove overlay entities whose ruler no longer exists.
pub fn cleanup_orphaned_overlays(
    mut commands: Commands,
    overlays: Query<(Entity, &MeasureOverlay)>,
    manipulators: Query<(), With<RulerManipulator>>,
) {
    for (entity, overlay) in &overlays {
        if !manipulators.contains(overlay.manipulator) {
            commands.entity(entity).despawn();
        }
    }
}

/// Draws rulers: point markers, segment bars and distance labels.
///
/// Needs the PBR and UI plugins; [`crate::tools::ruler::MeasurementToolPlugin`]
/// must be added as well.
pub struct RulerRenderPlugin;

impl Plugin for RulerRenderPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_ruler_draw_assets).add_systems(
            Update,
            (
                cleanup_orphaned_overlays,
                redraw_ruler_geometry,
                place_segment_labels,
            )
                .chain()
                .after(MeasureSet::Present),
        );
    }
}
