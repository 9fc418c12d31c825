use crate::engine::camera::viewport::ViewportGeometry;
use crate::engine::core::settings::MeasurementSettings;
use crate::engine::raycast::mesh::{Measurable, MeshSurfaceRaycast, RaycastScope};
use crate::engine::raycast::{CameraMatrices, SurfaceRaycast, pick_surface_point};
use crate::error::PickError;
use crate::tools::gesture::{
    ClickClassifier, GestureArbiter, GestureEvent, GestureKind, PointerSubscriptions,
    classify_pointer_gestures, pointer_input_subscribed,
};
use crate::tools::measure::MeasurementModel;
use crate::tools::presenter::{
    MeasureOverlay, RulerPresentation, RulerRedrawRequest, refresh_ruler_presentation,
};
use crate::tools::tool_manager::{
    ClearToolEvent, ScenePicking, ToolState, ToolStateChanged, ToolStateMachine,
    ToolToggleEvent, handle_clear_tool_events, handle_tool_keyboard_shortcuts,
    handle_tool_toggle_events,
};
use bevy::picking::mesh_picking::ray_cast::MeshRayCast;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

/// Interactive ruler owned by one viewport scene.
///
/// Owns the measurement exclusively; despawning the entity destroys the
/// measurement and lets the overlay cleanup remove its geometry.
#[derive(Component, Debug, Default)]
#[require(RulerPresentation)]
pub struct RulerManipulator {
    pub tool: ToolStateMachine,
    /// Camera used for picking; the first active camera when unset.
    pub camera: Option<Entity>,
    model: MeasurementModel,
    active: bool,
    pending: Vec<(MeasurementChange, u64)>,
}

impl RulerManipulator {
    pub fn with_camera(camera: Entity) -> Self {
        Self {
            camera: Some(camera),
            ..default()
        }
    }

    pub fn model(&self) -> &MeasurementModel {
        &self.model
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Activation lifecycle. Deactivating starts the next measurement fresh.
    pub fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        self.active = active;
        if !active {
            self.clear_points();
        }
    }

    pub fn add_point(&mut self, point: Vec3) {
        self.model.add_point(point);
        let change = MeasurementChange::PointAdded {
            index: self.model.len() - 1,
            point,
        };
        self.pending.push((change, self.model.revision()));
    }

    pub fn clear_points(&mut self) {
        self.model.clear();
        self.pending
            .push((MeasurementChange::Cleared, self.model.revision()));
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Queued mutations with the model revision each one produced.
    pub fn take_changes(&mut self) -> Vec<(MeasurementChange, u64)> {
        std::mem::take(&mut self.pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasurementChange {
    PointAdded { index: usize, point: Vec3 },
    Cleared,
}

/// One notification per model mutation.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct MeasurementChanged {
    pub manipulator: Entity,
    pub change: MeasurementChange,
    pub revision: u64,
}

/// Work accepted by the gesture arbiter for a ruler in `Ruler` mode.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub enum RulerAction {
    Pick { manipulator: Entity, screen_pos: Vec2 },
    Clear { manipulator: Entity },
}

/// Emitted when a click produced no point, for the frontend.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct PickMissed {
    pub manipulator: Entity,
    pub error: PickError,
}

/// Where closest-hit queries are answered.
#[derive(Resource, Default)]
pub enum PickBackend {
    /// Scene meshes through Bevy's mesh ray casting.
    #[default]
    SceneMeshes,
    /// A self-contained collaborator, for headless runs.
    Static(Box<dyn SurfaceRaycast + Send + Sync>),
}

impl PickBackend {
    pub fn uses_scene_meshes(&self) -> bool {
        matches!(self, Self::SceneMeshes)
    }
}

fn scene_mesh_backend(backend: Res<PickBackend>) -> bool {
    backend.uses_scene_meshes()
}

fn static_backend(backend: Res<PickBackend>) -> bool {
    !backend.uses_scene_meshes()
}

/// Apply the arbiter to this frame's gestures and forward the survivors.
///
/// Gestures are grouped per manipulator; everything reported in one frame
/// for one manipulator counts as one interaction. Clicks on a ruler that
/// is not in `Ruler` mode are dropped here, before any geometry query.
pub fn resolve_ruler_gestures(
    mut gestures: EventReader<GestureEvent>,
    arbiter: Res<GestureArbiter>,
    manipulators: Query<&RulerManipulator>,
    mut actions: EventWriter<RulerAction>,
) {
    let mut batches: Vec<(Entity, Vec<GestureKind>)> = Vec::new();
    for event in gestures.read() {
        match batches.iter_mut().find(|(e, _)| *e == event.manipulator) {
            Some((_, kinds)) => kinds.push(event.kind),
            None => batches.push((event.manipulator, vec![event.kind])),
        }
    }

    for (entity, kinds) in batches {
        let Ok(manipulator) = manipulators.get(entity) else {
            continue;
        };
        if !manipulator.tool.is_active(ToolState::Ruler) {
            continue;
        }

        for kind in arbiter.resolve_batch(&kinds) {
            actions.write(match kind {
                GestureKind::Click { screen_pos } => RulerAction::Pick {
                    manipulator: entity,
                    screen_pos,
                },
                GestureKind::DoubleClick => RulerAction::Clear {
                    manipulator: entity,
                },
            });
        }
    }
}

/// Camera a manipulator picks through: its own, else the highest-order active one.
pub fn measurement_camera<'a>(
    manipulator: &RulerManipulator,
    cameras: &'a Query<(Entity, &Camera, &GlobalTransform)>,
) -> Option<(&'a Camera, &'a GlobalTransform)> {
    match manipulator.camera {
        Some(entity) => cameras.get(entity).ok().map(|(_, c, t)| (c, t)),
        None => cameras
            .iter()
            .filter(|(_, camera, _)| camera.is_active)
            .max_by_key(|(_, camera, _)| camera.order)
            .map(|(_, c, t)| (c, t)),
    }
}

/// Ray-cast one accepted click and append the hit to the measurement.
#[allow(clippy::too_many_arguments)]
fn apply_pick<R: SurfaceRaycast + ?Sized>(
    entity: Entity,
    manipulator: &mut RulerManipulator,
    screen_pos: Vec2,
    window: &Window,
    camera: (&Camera, &GlobalTransform),
    settings: &MeasurementSettings,
    raycast: &mut R,
    missed: &mut EventWriter<PickMissed>,
) {
    let (camera, camera_transform) = camera;
    let geometry = ViewportGeometry::from_camera(camera, window)
        .with_content_aspect(settings.content_aspect);
    let matrices = CameraMatrices::from_camera(camera, camera_transform);

    match pick_surface_point(
        screen_pos,
        &geometry,
        &matrices,
        settings.max_ray_distance,
        raycast,
    ) {
        Ok(hit) => {
            manipulator.add_point(hit.position);
            info!(
                "[RULER] point {} at {:?} ({} along ray)",
                manipulator.model().len(),
                hit.position,
                hit.distance
            );
        }
        Err(error @ PickError::NoRay(reason)) => {
            debug!("[RULER] click at {screen_pos:?} ignored: {reason}");
            missed.write(PickMissed {
                manipulator: entity,
                error,
            });
        }
        Err(error @ PickError::NoHit) => {
            info!("[RULER] no mesh at {screen_pos:?}");
            missed.write(PickMissed {
                manipulator: entity,
                error,
            });
        }
    }
}

/// Pick against scene meshes, skipping measurement overlay geometry.
pub fn pick_points_on_meshes(
    mut actions: EventReader<RulerAction>,
    mut manipulators: Query<&mut RulerManipulator>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(Entity, &Camera, &GlobalTransform)>,
    overlay: Query<(), With<MeasureOverlay>>,
    measurable: Query<(), With<Measurable>>,
    settings: Res<MeasurementSettings>,
    mut mesh_ray_cast: MeshRayCast,
    mut missed: EventWriter<PickMissed>,
) {
    let Ok(window) = windows.single() else {
        return;
    };

    let scope = settings.raycast_scope;
    let filter = |entity: Entity| {
        !overlay.contains(entity)
            && (scope == RaycastScope::Scene || measurable.contains(entity))
    };

    for action in actions.read() {
        let RulerAction::Pick {
            manipulator: entity,
            screen_pos,
        } = *action
        else {
            continue;
        };
        let Ok(mut manipulator) = manipulators.get_mut(entity) else {
            continue;
        };
        if !manipulator.tool.is_active(ToolState::Ruler) {
            continue;
        }
        let Some(camera) = measurement_camera(&manipulator, &cameras) else {
            warn!("[RULER] no active camera to pick from");
            continue;
        };

        let mut raycast = MeshSurfaceRaycast::new(&mut mesh_ray_cast, &filter);
        apply_pick(
            entity,
            &mut manipulator,
            screen_pos,
            window,
            camera,
            &settings,
            &mut raycast,
            &mut missed,
        );
    }
}

/// Pick against a [`PickBackend::Static`] collaborator.
pub fn pick_points_on_static_scene(
    mut actions: EventReader<RulerAction>,
    mut manipulators: Query<&mut RulerManipulator>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(Entity, &Camera, &GlobalTransform)>,
    settings: Res<MeasurementSettings>,
    mut backend: ResMut<PickBackend>,
    mut missed: EventWriter<PickMissed>,
) {
    let PickBackend::Static(raycast) = &mut *backend else {
        return;
    };
    let Ok(window) = windows.single() else {
        return;
    };

    for action in actions.read() {
        let RulerAction::Pick {
            manipulator: entity,
            screen_pos,
        } = *action
        else {
            continue;
        };
        let Ok(mut manipulator) = manipulators.get_mut(entity) else {
            continue;
        };
        if !manipulator.tool.is_active(ToolState::Ruler) {
            continue;
        }
        let Some(camera) = measurement_camera(&manipulator, &cameras) else {
            warn!("[RULER] no active camera to pick from");
            continue;
        };

        apply_pick(
            entity,
            &mut manipulator,
            screen_pos,
            window,
            camera,
            &settings,
            raycast.as_mut(),
            &mut missed,
        );
    }
}

/// Double clicks on an active ruler wipe the measurement.
pub fn apply_ruler_clears(
    mut actions: EventReader<RulerAction>,
    mut manipulators: Query<&mut RulerManipulator>,
) {
    for action in actions.read() {
        let RulerAction::Clear {
            manipulator: entity,
        } = *action
        else {
            continue;
        };
        let Ok(mut manipulator) = manipulators.get_mut(entity) else {
            continue;
        };
        if !manipulator.tool.is_active(ToolState::Ruler) {
            continue;
        }
        manipulator.clear_points();
        debug!("[RULER] measurement cleared");
    }
}

/// Turn queued model mutations into [`MeasurementChanged`] events.
pub fn publish_measurement_changes(
    mut manipulators: Query<(Entity, &mut RulerManipulator)>,
    mut changed: EventWriter<MeasurementChanged>,
) {
    for (entity, mut manipulator) in &mut manipulators {
        if !manipulator.has_pending_changes() {
            continue;
        }
        for (change, revision) in manipulator.take_changes() {
            changed.write(MeasurementChanged {
                manipulator: entity,
                change,
                revision,
            });
        }
    }
}

/// Drop input subscriptions of rulers that were despawned while active.
pub fn release_despawned_manipulators(
    mut removed: RemovedComponents<RulerManipulator>,
    mut subscriptions: ResMut<PointerSubscriptions>,
    mut picking: ResMut<ScenePicking>,
    mut classifier: ResMut<ClickClassifier>,
) {
    for entity in removed.read() {
        if !subscriptions.is_subscribed(entity) {
            continue;
        }
        subscriptions.unsubscribe(entity);
        if subscriptions.is_empty() {
            picking.enabled = true;
            classifier.reset();
        }
        debug!("[TOOL] released input of despawned ruler {entity}");
    }
}

/// Keep the classifier in step with runtime settings.
fn sync_classifier_settings(
    settings: Res<MeasurementSettings>,
    mut classifier: ResMut<ClickClassifier>,
) {
    if !settings.is_changed() {
        return;
    }
    classifier.window_secs = settings.double_click_secs;
    classifier.max_drift_px = settings.double_click_drift_px;
}

/// Ordering of the measurement pipeline within `Update`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasureSet {
    /// Toolbar, keyboard and pointer input become events.
    Input,
    /// Tool transitions and gesture arbitration.
    Resolve,
    /// Ray queries and model mutation.
    Mutate,
    /// Change notification and presentation.
    Present,
}

/// Point-picking and measurement engine without any drawing.
///
/// Works headless; add `RulerRenderPlugin` to draw the result.
pub struct MeasurementToolPlugin;

impl Plugin for MeasurementToolPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MeasurementSettings>()
            .init_resource::<GestureArbiter>()
            .init_resource::<ClickClassifier>()
            .init_resource::<PointerSubscriptions>()
            .init_resource::<ScenePicking>()
            .init_resource::<PickBackend>()
            .add_event::<GestureEvent>()
            .add_event::<ToolToggleEvent>()
            .add_event::<ClearToolEvent>()
            .add_event::<ToolStateChanged>()
            .add_event::<RulerAction>()
            .add_event::<PickMissed>()
            .add_event::<MeasurementChanged>()
            .add_event::<RulerRedrawRequest>()
            .configure_sets(
                Update,
                (
                    MeasureSet::Input,
                    MeasureSet::Resolve,
                    MeasureSet::Mutate,
                    MeasureSet::Present,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    sync_classifier_settings,
                    release_despawned_manipulators,
                    handle_tool_keyboard_shortcuts
                        .run_if(resource_exists::<ButtonInput<KeyCode>>),
                    classify_pointer_gestures.run_if(
                        resource_exists::<ButtonInput<MouseButton>>
                            .and(pointer_input_subscribed),
                    ),
                )
                    .chain()
                    .in_set(MeasureSet::Input),
            )
            .add_systems(
                Update,
                (
                    handle_tool_toggle_events,
                    handle_clear_tool_events,
                    resolve_ruler_gestures,
                )
                    .chain()
                    .in_set(MeasureSet::Resolve),
            )
            .add_systems(
                Update,
                (
                    pick_points_on_meshes.run_if(scene_mesh_backend),
                    pick_points_on_static_scene.run_if(static_backend),
                    apply_ruler_clears,
                )
                    .chain()
                    .in_set(MeasureSet::Mutate),
            )
            .add_systems(
                Update,
                (publish_measurement_changes, refresh_ruler_presentation)
                    .chain()
                    .in_set(MeasureSet::Present),
            );
    }
}
