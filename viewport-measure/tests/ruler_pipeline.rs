use bevy::ecs::event::Events;
use bevy::prelude::*;
use bevy::window::{PrimaryWindow, WindowResolution};
use viewport_measure::engine::raycast::bounds::BoxSceneRaycast;
use viewport_measure::error::PickError;
use viewport_measure::tools::gesture::{GestureEvent, GestureKind, PointerSubscriptions};
use viewport_measure::tools::presenter::{RulerPresentation, RulerRedrawRequest};
use viewport_measure::tools::ruler::{
    MeasurementChange, MeasurementChanged, MeasurementToolPlugin, PickBackend, PickMissed,
    RulerAction, RulerManipulator,
};
use viewport_measure::tools::tool_manager::{
    ClearToolEvent, ScenePicking, ToolRequest, ToolSelectionSource, ToolState, ToolStateChanged,
    ToolToggleEvent,
};

/// Cursor over the centre of the 200x200 window; hits the cube's +Z face at (0, 0, 0.5).
const CENTRE: Vec2 = Vec2::new(100.0, 100.0);
/// Right of centre; hits the cube's +Z face at x = 0.4.
const RIGHT: Vec2 = Vec2::new(140.0, 100.0);
/// Top-left corner; the ray passes beside the cube.
const EMPTY: Vec2 = Vec2::new(5.0, 5.0);

struct Harness {
    app: App,
    ruler: Entity,
}

impl Harness {
    /// Headless app with a unit cube at the origin and a camera at z = 10
    /// looking down -Z. Without a render plugin the projection stays identity,
    /// so the view spans [-1, 1] on both axes like an orthographic camera.
    fn new() -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins).add_plugins(MeasurementToolPlugin);

        let mut scene = BoxSceneRaycast::default();
        scene.add_box(Vec3::splat(-0.5), Vec3::splat(0.5));
        app.insert_resource(PickBackend::Static(Box::new(scene)));

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

        app.update();
        Self { app, ruler }
    }

    /// Run one frame. Observed event buffers are emptied first so they hold
    /// exactly what this frame emitted.
    fn update(&mut self) {
        let world = self.app.world_mut();
        world.resource_mut::<Events<ToolStateChanged>>().clear();
        world.resource_mut::<Events<RulerAction>>().clear();
        world.resource_mut::<Events<PickMissed>>().clear();
        world.resource_mut::<Events<MeasurementChanged>>().clear();
        world.resource_mut::<Events<RulerRedrawRequest>>().clear();
        self.app.update();
    }

    fn toggle(&mut self, requested: ToolRequest) {
        self.app.world_mut().send_event(ToolToggleEvent {
            requested,
            source: ToolSelectionSource::Toolbar,
        });
        self.update();
    }

    /// Deliver a batch of gestures for one interaction and run a frame.
    fn gestures(&mut self, kinds: &[GestureKind]) {
        for kind in kinds {
            self.app.world_mut().send_event(GestureEvent {
                manipulator: self.ruler,
                kind: *kind,
            });
        }
        self.update();
    }

    fn click(&mut self, screen_pos: Vec2) {
        self.gestures(&[GestureKind::Click { screen_pos }]);
    }

    fn ruler(&self) -> &RulerManipulator {
        self.app.world().get::<RulerManipulator>(self.ruler).unwrap()
    }

    fn points(&self) -> Vec<Vec3> {
        self.ruler().model().points().to_vec()
    }

    fn state(&self) -> ToolState {
        self.ruler().tool.state()
    }

    fn press_left(&mut self, cursor: Vec2) {
        let world = self.app.world_mut();
        let mut window = world
            .query_filtered::<&mut Window, With<PrimaryWindow>>()
            .single_mut(world)
            .unwrap();
        window.set_cursor_position(Some(cursor));
        world
            .resource_mut::<ButtonInput<MouseButton>>()
            .press(MouseButton::Left);
        self.update();

        let mut mouse = self.app.world_mut().resource_mut::<ButtonInput<MouseButton>>();
        mouse.release(MouseButton::Left);
        mouse.clear();
    }

    /// Events emitted during the last [`Harness::update`].
    fn last_frame<E: Event + Clone>(&self) -> Vec<E> {
        let events = self.app.world().resource::<Events<E>>();
        events.get_cursor().read(events).cloned().collect()
    }
}

fn approx(a: Vec3, b: Vec3) -> bool {
    a.distance(b) < 1e-4
}

#[test]
fn toggle_off_ignores_requested_mode() {
    let mut h = Harness::new();
    assert_eq!(h.state(), ToolState::Disabled);

    h.toggle(ToolRequest::Ruler);
    assert_eq!(h.state(), ToolState::Ruler);

    h.toggle(ToolRequest::Angle);
    assert_eq!(h.state(), ToolState::Disabled);

    // Angle is never reached from Disabled either.
    h.toggle(ToolRequest::Angle);
    assert_eq!(h.state(), ToolState::Disabled);
}

#[test]
fn activation_captures_clicks_and_deactivation_releases_them() {
    let mut h = Harness::new();

    h.toggle(ToolRequest::Ruler);
    assert!(!h.app.world().resource::<ScenePicking>().enabled);
    assert!(h.app.world().resource::<PointerSubscriptions>().is_subscribed(h.ruler));
    assert!(h.ruler().is_active());

    let changes: Vec<ToolStateChanged> = h.last_frame();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].to, ToolState::Ruler);

    h.toggle(ToolRequest::Ruler);
    assert!(h.app.world().resource::<ScenePicking>().enabled);
    assert!(h.app.world().resource::<PointerSubscriptions>().is_empty());
    assert!(!h.ruler().is_active());
}

#[test]
fn click_in_ruler_mode_adds_surface_point() {
    let mut h = Harness::new();
    h.toggle(ToolRequest::Ruler);

    h.click(CENTRE);
    h.click(RIGHT);

    let points = h.points();
    assert_eq!(points.len(), 2);
    assert!(approx(points[0], Vec3::new(0.0, 0.0, 0.5)), "{points:?}");
    assert!(approx(points[1], Vec3::new(0.4, 0.0, 0.5)), "{points:?}");

    let segments = h.ruler().model().segments();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].distance, 0.4);
}

#[test]
fn clicks_while_disabled_never_add_points() {
    let mut h = Harness::new();

    h.click(CENTRE);
    h.click(RIGHT);
    assert!(h.points().is_empty());

    // Nothing was even attempted.
    assert!(h.last_frame::<PickMissed>().is_empty());
    assert!(h.last_frame::<RulerAction>().is_empty());
}

#[test]
fn double_click_wins_over_concurrent_click() {
    let mut h = Harness::new();
    h.toggle(ToolRequest::Ruler);
    h.click(CENTRE);
    h.click(RIGHT);
    assert_eq!(h.points().len(), 2);

    h.gestures(&[GestureKind::Click { screen_pos: CENTRE }, GestureKind::DoubleClick]);
    assert!(h.points().is_empty());

    h.click(CENTRE);
    h.gestures(&[GestureKind::DoubleClick, GestureKind::Click { screen_pos: RIGHT }]);
    assert!(h.points().is_empty());
}

#[test]
fn miss_leaves_model_untouched_and_is_reported() {
    let mut h = Harness::new();
    h.toggle(ToolRequest::Ruler);
    h.click(CENTRE);

    h.click(EMPTY);
    assert_eq!(h.points().len(), 1);

    let missed: Vec<PickMissed> = h.last_frame();
    assert_eq!(missed.len(), 1);
    assert_eq!(missed[0].error, PickError::NoHit);
}

#[test]
fn deactivation_clears_measurement() {
    let mut h = Harness::new();
    h.toggle(ToolRequest::Ruler);
    h.click(CENTRE);
    h.click(RIGHT);

    h.app.world_mut().send_event(ClearToolEvent {
        source: ToolSelectionSource::Keyboard,
    });
    h.update();

    assert_eq!(h.state(), ToolState::Disabled);
    assert!(h.points().is_empty());

    // Re-activating starts fresh.
    h.toggle(ToolRequest::Ruler);
    h.click(CENTRE);
    assert_eq!(h.points().len(), 1);
}

#[test]
fn every_mutation_is_notified_once() {
    let mut h = Harness::new();
    h.toggle(ToolRequest::Ruler);

    h.click(CENTRE);
    let changed: Vec<MeasurementChanged> = h.last_frame();
    assert_eq!(changed.len(), 1);
    assert!(matches!(
        changed[0].change,
        MeasurementChange::PointAdded { index: 0, .. }
    ));

    h.gestures(&[GestureKind::DoubleClick]);
    let changed: Vec<MeasurementChanged> = h.last_frame();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].change, MeasurementChange::Cleared);

    // Clearing an empty measurement still notifies.
    h.gestures(&[GestureKind::DoubleClick]);
    let changed: Vec<MeasurementChanged> = h.last_frame();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].change, MeasurementChange::Cleared);
}

#[test]
fn presentation_tracks_segments_and_requests_redraw() {
    let mut h = Harness::new();
    h.toggle(ToolRequest::Ruler);

    h.click(CENTRE);
    let presentation = h.app.world().get::<RulerPresentation>(h.ruler).unwrap();
    assert_eq!(presentation.polyline.len(), 1);
    assert!(presentation.labels.is_empty());
    assert_eq!(h.last_frame::<RulerRedrawRequest>().len(), 1);

    h.click(RIGHT);
    let presentation = h.app.world().get::<RulerPresentation>(h.ruler).unwrap();
    assert_eq!(presentation.labels.len(), 1);
    assert_eq!(presentation.labels[0].text, "0.4 cm");
    assert!(approx(presentation.labels[0].anchor, Vec3::new(0.2, 0.0, 0.5)));

    // Nothing changed, nothing to redraw.
    h.update();
    assert!(h.last_frame::<RulerRedrawRequest>().is_empty());
}

#[test]
fn gestures_for_despawned_ruler_are_dropped() {
    let mut h = Harness::new();
    h.toggle(ToolRequest::Ruler);
    h.app.world_mut().despawn(h.ruler);

    h.click(CENTRE);
    assert!(h.last_frame::<RulerAction>().is_empty());

    // Its input capture went with it.
    assert!(h.app.world().resource::<PointerSubscriptions>().is_empty());
    assert!(h.app.world().resource::<ScenePicking>().enabled);
}

#[test]
fn left_presses_are_classified_for_subscribed_rulers() {
    let mut h = Harness::new();
    h.app.init_resource::<ButtonInput<MouseButton>>();
    h.toggle(ToolRequest::Ruler);

    h.press_left(CENTRE);
    assert_eq!(h.points().len(), 1);

    // Second press inside the double-click window clears instead of adding.
    h.press_left(CENTRE);
    assert!(h.points().is_empty());
}

#[test]
fn first_press_after_reactivation_adds_a_point() {
    let mut h = Harness::new();
    h.app.init_resource::<ButtonInput<MouseButton>>();
    h.toggle(ToolRequest::Ruler);

    h.press_left(CENTRE);
    assert_eq!(h.points().len(), 1);

    h.toggle(ToolRequest::Ruler);
    h.toggle(ToolRequest::Ruler);
    assert!(h.points().is_empty());

    // Inside the double-click window of the earlier press, yet a fresh sequence.
    h.press_left(CENTRE);
    assert_eq!(h.points().len(), 1);
    assert!(
        h.last_frame::<MeasurementChanged>()
            .iter()
            .all(|c| c.change != MeasurementChange::Cleared)
    );
}
