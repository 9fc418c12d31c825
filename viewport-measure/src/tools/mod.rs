//! Interactive ruler: click gestures, tool modes, measurement and drawing.
//!
//! ## Ruler Architecture
//!
//! Each [`ruler::RulerManipulator`] owns one measurement and one tool state
//! machine. Every stage of a click is a separate system so the engine runs
//! headless and the drawing is optional:
//!
//! ```text
//! Left press
//!   └─> classify_pointer_gestures()      Click, or Click + DoubleClick
//!       └─> GestureEvent
//!           └─> resolve_ruler_gestures() GestureArbiter: double click wins
//!               └─> RulerAction
//!                   ├─> pick_points_*()      ray → closest hit → add_point
//!                   └─> apply_ruler_clears() clear
//!                       └─> publish_measurement_changes()
//!                           └─> MeasurementChanged
//!                               └─> refresh_ruler_presentation()
//!                                   └─> RulerRedrawRequest
//! ```
//!
//! ## Tool Modes
//!
//! `Disabled`, `Ruler` and `Angle`. A toolbar toggle from `Disabled` with a
//! ruler request switches the ruler on; any toggle while a mode is active
//! switches it off, whatever was requested. Switching on captures left
//! clicks (default scene picking is suspended), switching off releases them
//! and clears the measurement.
//!
//! ### Activation
//! - **Native**: `R` toggles the ruler, `G` requests the angle tool, `Esc` switches off
//! - **WASM**: `tool_selection` / `clear_tool` RPC methods
//!
//! ## Click Handling
//!
//! - Clicks on a disabled ruler are dropped before any ray is cast
//! - A click that misses the scene leaves the measurement untouched
//! - The second press of a double click never adds a point
//!
//! ## Drawing
//!
//! [`presenter::RulerRenderPlugin`] draws point markers and segment bars on
//! the overlay render layer and keeps distance labels (`"5.0 cm"`) above each
//! segment midpoint at a constant screen size.

/// Click classification, gesture precedence and pointer subscriptions.
pub mod gesture;

/// Distance and midpoint math plus the ordered point model.
pub mod measure;

/// Presentation derived from the model and the optional renderer.
pub mod presenter;

/// The ruler manipulator component, click pipeline and plugin.
pub mod ruler;

/// Tool modes, toggle transitions and the events that drive them.
pub mod tool_manager;
