//! Application assembly: plugins, window, settings and the demo scene.

/// Builds the viewer app for native and WASM targets.
pub mod app_setup;

/// Measurement settings and their optional JSON override.
pub mod settings;

/// Platform-specific window configuration for native and WASM builds.
pub mod window_config;
