//! Shared defaults for the viewport measurement tool.
//!
//! Values here are compile-time fallbacks; most of them can be overridden at
//! runtime through the `MeasurementSettings` resource.

/// Sizes and colours used when drawing measurement geometry and labels.
pub mod render_settings;

/// Ray, gesture and reporting defaults for the ruler.
pub mod measurement;
