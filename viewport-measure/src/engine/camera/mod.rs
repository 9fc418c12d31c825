//! Camera-side geometry for picking and demo navigation.
//!
//! Maps window cursor positions onto the rendered image, including
//! letterboxed viewports, and provides a fly camera for the viewer binary.

/// Viewport rectangle, letterbox bars and cursor to NDC mapping.
pub mod viewport;

/// Fly camera resource and controller system for scene navigation.
pub mod viewport_camera;
