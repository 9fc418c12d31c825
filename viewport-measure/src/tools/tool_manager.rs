use crate::tools::gesture::{ClickClassifier, PointerSubscriptions};
use crate::tools::ruler::RulerManipulator;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Mode of a measurement manipulator. Exactly one is current at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolState {
    #[default]
    Disabled,
    Ruler,
    /// Reserved for angle measurement; no transition leads here yet.
    Angle,
}

impl ToolState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Ruler => "ruler",
            Self::Angle => "angle",
        }
    }
}

/// Mode named by a toolbar button or shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolRequest {
    Ruler,
    Angle,
}

impl ToolRequest {
    /// Parse the toolbar identifiers (`"RULER"`, `"ANGLE"`, any case).
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ruler" => Some(Self::Ruler),
            "angle" => Some(Self::Angle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ruler => "ruler",
            Self::Angle => "angle",
        }
    }
}

/// Lifecycle side effect implied by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Capture clicks, subscribe to pointer input.
    Activate,
    /// Release clicks, unsubscribe and clear the measurement.
    Deactivate,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolTransition {
    pub from: ToolState,
    pub to: ToolState,
    pub activation: Activation,
}

/// Toolbar toggle transition.
///
/// Any active mode switches off whatever mode was requested. From
/// `Disabled` only a ruler request switches on; an angle request is ignored
/// until that mode exists.
pub fn toggle(current: ToolState, requested: ToolRequest) -> ToolTransition {
    let (to, activation) = match (current, requested) {
        (ToolState::Ruler | ToolState::Angle, _) => (ToolState::Disabled, Activation::Deactivate),
        (ToolState::Disabled, ToolRequest::Ruler) => (ToolState::Ruler, Activation::Activate),
        (ToolState::Disabled, ToolRequest::Angle) => (ToolState::Disabled, Activation::Unchanged),
    };

    ToolTransition {
        from: current,
        to,
        activation,
    }
}

/// Current mode plus the transition authority for one manipulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolStateMachine {
    state: ToolState,
}

impl ToolStateMachine {
    pub fn state(&self) -> ToolState {
        self.state
    }

    pub fn is_active(&self, state: ToolState) -> bool {
        self.state == state
    }

    pub fn toggle(&mut self, requested: ToolRequest) -> ToolTransition {
        let transition = toggle(self.state, requested);
        self.state = transition.to;
        transition
    }

    /// Switch off regardless of mode. `None` when already disabled.
    pub fn deactivate(&mut self) -> Option<ToolTransition> {
        if self.state == ToolState::Disabled {
            return None;
        }
        let transition = ToolTransition {
            from: self.state,
            to: ToolState::Disabled,
            activation: Activation::Deactivate,
        };
        self.state = ToolState::Disabled;
        Some(transition)
    }
}

/// Whether pointer events reach default scene navigation and selection.
///
/// An active ruler captures clicks; everything else should check
/// `enabled` before reacting to the left button.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenePicking {
    pub enabled: bool,
}

impl Default for ScenePicking {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Source of a tool request for logging and frontend echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSelectionSource {
    Toolbar,
    Keyboard,
    Rpc,
}

/// Toolbar-style toggle request applied to every manipulator.
#[derive(Event, Debug, Clone, Copy)]
pub struct ToolToggleEvent {
    pub requested: ToolRequest,
    pub source: ToolSelectionSource,
}

/// Switch every manipulator off without toggling.
#[derive(Event, Debug, Clone, Copy)]
pub struct ClearToolEvent {
    pub source: ToolSelectionSource,
}

/// Emitted after a manipulator's mode actually changed.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolStateChanged {
    pub manipulator: Entity,
    pub from: ToolState,
    pub to: ToolState,
}

/// Apply a transition's side effects on the manipulator and shared input state.
fn apply_transition(
    entity: Entity,
    manipulator: &mut RulerManipulator,
    transition: ToolTransition,
    picking: &mut ScenePicking,
    subscriptions: &mut PointerSubscriptions,
    classifier: &mut ClickClassifier,
    changed: &mut EventWriter<ToolStateChanged>,
) {
    match transition.activation {
        Activation::Activate => {
            picking.enabled = false;
            subscriptions.subscribe(entity);
            manipulator.set_active(true);
        }
        Activation::Deactivate => {
            subscriptions.unsubscribe(entity);
            if subscriptions.is_empty() {
                picking.enabled = true;
                // A press from before the switch-off must not pair with the next one.
                classifier.reset();
            }
            manipulator.set_active(false);
        }
        Activation::Unchanged => return,
    }

    changed.write(ToolStateChanged {
        manipulator: entity,
        from: transition.from,
        to: transition.to,
    });
}

/// Drive every manipulator's state machine from toolbar toggles.
pub fn handle_tool_toggle_events(
    mut events: EventReader<ToolToggleEvent>,
    mut manipulators: Query<(Entity, &mut RulerManipulator)>,
    mut picking: ResMut<ScenePicking>,
    mut subscriptions: ResMut<PointerSubscriptions>,
    mut classifier: ResMut<ClickClassifier>,
    mut changed: EventWriter<ToolStateChanged>,
) {
    for event in events.read() {
        for (entity, mut manipulator) in &mut manipulators {
            let transition = manipulator.tool.toggle(event.requested);

            match transition.activation {
                Activation::Unchanged => {
                    debug!(
                        "[TOOL] {} request via {:?} ignored while {}",
                        event.requested.as_str(),
                        event.source,
                        transition.from.as_str()
                    );
                }
                _ => info!(
                    "[TOOL] {} -> {} via {:?}",
                    transition.from.as_str(),
                    transition.to.as_str(),
                    event.source
                ),
            }

            apply_transition(
                entity,
                &mut manipulator,
                transition,
                &mut picking,
                &mut subscriptions,
                &mut classifier,
                &mut changed,
            );
        }
    }
}

/// Deactivate every active manipulator.
pub fn handle_clear_tool_events(
    mut events: EventReader<ClearToolEvent>,
    mut manipulators: Query<(Entity, &mut RulerManipulator)>,
    mut picking: ResMut<ScenePicking>,
    mut subscriptions: ResMut<PointerSubscriptions>,
    mut classifier: ResMut<ClickClassifier>,
    mut changed: EventWriter<ToolStateChanged>,
) {
    for event in events.read() {
        for (entity, mut manipulator) in &mut manipulators {
            let Some(transition) = manipulator.tool.deactivate() else {
                continue;
            };
            info!(
                "[TOOL] {} cleared via {:?}",
                transition.from.as_str(),
                event.source
            );
            apply_transition(
                entity,
                &mut manipulator,
                transition,
                &mut picking,
                &mut subscriptions,
                &mut classifier,
                &mut changed,
            );
        }
    }
}

/// Keyboard shortcuts standing in for toolbar buttons (native builds only).
#[cfg(not(target_arch = "wasm32"))]
pub fn handle_tool_keyboard_shortcuts(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut toggles: EventWriter<ToolToggleEvent>,
    mut clears: EventWriter<ClearToolEvent>,
) {
    if keyboard.just_pressed(KeyCode::KeyR) {
        toggles.write(ToolToggleEvent {
            requested: ToolRequest::Ruler,
            source: ToolSelectionSource::Keyboard,
        });
    }

    if keyboard.just_pressed(KeyCode::KeyG) {
        toggles.write(ToolToggleEvent {
            requested: ToolRequest::Angle,
            source: ToolSelectionSource::Keyboard,
        });
    }

    if keyboard.just_pressed(KeyCode::Escape) {
        clears.write(ClearToolEvent {
            source: ToolSelectionSource::Keyboard,
        });
    }
}

/// No shortcuts on the web; the frontend drives tools over RPC.
#[cfg(target_arch = "wasm32")]
pub fn handle_tool_keyboard_shortcuts() {}
