//! Click gestures and their precedence.
//!
//! The classifier plays the part of the windowing framework: it turns raw
//! left-button presses into `Click` / `DoubleClick` gestures. The arbiter is
//! the only place that decides which of several gestures reported for the
//! same interaction survives.

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use constants::measurement::{DOUBLE_CLICK_DRIFT_PX, DOUBLE_CLICK_SECS};

/// Identifies a gesture for precedence only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureTag {
    Left,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureKind {
    /// Single left click at a cursor position in window logical pixels.
    Click { screen_pos: Vec2 },
    DoubleClick,
}

impl GestureKind {
    pub fn tag(&self) -> GestureTag {
        match self {
            Self::Click { .. } => GestureTag::Left,
            Self::DoubleClick => GestureTag::Double,
        }
    }
}

/// Classified gesture addressed to one manipulator.
///
/// `manipulator` is a lookup handle only; a gesture never keeps its
/// manipulator alive and is dropped when the handle no longer resolves.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct GestureEvent {
    pub manipulator: Entity,
    pub kind: GestureKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Accept,
    Suppress,
}

/// Gesture precedence shared by every gesture source that is handed it.
///
/// A double click prevents any other gesture reported alongside it. The rule
/// depends only on the set of tags, never on arrival order.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct GestureArbiter;

impl GestureArbiter {
    pub fn should_prevent(&self, gesture: GestureTag, preventer: GestureTag) -> bool {
        preventer == GestureTag::Double && gesture != GestureTag::Double
    }

    pub fn resolve(&self, gesture: GestureTag, active: &[GestureTag]) -> Resolution {
        if active.iter().any(|p| self.should_prevent(gesture, *p)) {
            Resolution::Suppress
        } else {
            Resolution::Accept
        }
    }

    /// Gestures from one interaction that survive, in their original order.
    pub fn resolve_batch(&self, batch: &[GestureKind]) -> Vec<GestureKind> {
        let tags: Vec<GestureTag> = batch.iter().map(GestureKind::tag).collect();
        batch
            .iter()
            .filter(|kind| self.resolve(kind.tag(), &tags) == Resolution::Accept)
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressClass {
    Single,
    Double,
}

/// Pairs consecutive left presses into double clicks.
#[derive(Resource, Debug, Clone)]
pub struct ClickClassifier {
    pub window_secs: f64,
    pub max_drift_px: f32,
    last_press: Option<(f64, Vec2)>,
}

impl Default for ClickClassifier {
    fn default() -> Self {
        Self::new(DOUBLE_CLICK_SECS, DOUBLE_CLICK_DRIFT_PX)
    }
}

impl ClickClassifier {
    pub fn new(window_secs: f64, max_drift_px: f32) -> Self {
        Self {
            window_secs,
            max_drift_px,
            last_press: None,
        }
    }

    /// Record a press. A double click consumes both presses, so a third
    /// press starts a new sequence.
    pub fn press(&mut self, now: f64, position: Vec2) -> PressClass {
        let paired = self.last_press.is_some_and(|(time, pos)| {
            now - time <= self.window_secs && pos.distance(position) <= self.max_drift_px
        });

        if paired {
            self.last_press = None;
            PressClass::Double
        } else {
            self.last_press = Some((now, position));
            PressClass::Single
        }
    }

    pub fn reset(&mut self) {
        self.last_press = None;
    }
}

/// Manipulators currently receiving pointer gestures.
#[derive(Resource, Debug, Default, Clone)]
pub struct PointerSubscriptions {
    subscribers: Vec<Entity>,
}

impl PointerSubscriptions {
    pub fn subscribe(&mut self, manipulator: Entity) {
        if !self.subscribers.contains(&manipulator) {
            self.subscribers.push(manipulator);
        }
    }

    pub fn unsubscribe(&mut self, manipulator: Entity) {
        self.subscribers.retain(|e| *e != manipulator);
    }

    pub fn is_subscribed(&self, manipulator: Entity) -> bool {
        self.subscribers.contains(&manipulator)
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.subscribers.iter().copied()
    }
}

/// Run condition: pointer input is only classified while someone listens.
pub fn pointer_input_subscribed(subscriptions: Res<PointerSubscriptions>) -> bool {
    !subscriptions.is_empty()
}

/// Turn left presses into gestures for every subscribed manipulator.
///
/// The second press of a double click is reported both as a click and as a
/// double click; the arbiter settles it downstream.
pub fn classify_pointer_gestures(
    mouse: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    time: Res<Time>,
    mut classifier: ResMut<ClickClassifier>,
    subscriptions: Res<PointerSubscriptions>,
    mut gestures: EventWriter<GestureEvent>,
) {
    if !mouse.just_pressed(MouseButton::Left) {
        return;
    }

    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        debug!("[RULER] left press without cursor position");
        return;
    };

    let class = classifier.press(time.elapsed_secs_f64(), cursor);

    for manipulator in subscriptions.iter() {
        gestures.write(GestureEvent {
            manipulator,
            kind: GestureKind::Click { screen_pos: cursor },
        });
        if class == PressClass::Double {
            gestures.write(GestureEvent {
                manipulator,
                kind: GestureKind::DoubleClick,
            });
        }
    }
}
