use bevy::color::{Color, LinearRgba};

/// Thickness of the cuboid drawn for each measured segment.
pub const DRAW_LINE_WIDTH: f32 = 0.02;
/// Radius of the marker drawn at every picked point.
pub const DRAW_VERTEX_SIZE: f32 = 0.035;

/// Render layer shared by all measurement overlay geometry.
pub const MEASURE_RENDER_LAYER: usize = 1;

pub const SEGMENT_COLOUR: Color = Color::srgb(1.0, 0.27, 0.0);
pub const SEGMENT_EMISSIVE: LinearRgba = LinearRgba::new(1.0, 0.5, 0.0, 1.0);
pub const VERTEX_COLOUR: Color = Color::srgb(1.0, 1.0, 0.2);
pub const VERTEX_EMISSIVE: LinearRgba = LinearRgba::new(1.0, 1.0, 0.2, 1.0);

pub const LABEL_COLOUR: Color = Color::srgb(1.0, 1.0, 1.0);
/// Label text size in logical pixels, constant regardless of camera distance.
pub const LABEL_FONT_SIZE: f32 = 20.0;
/// Screen-space lift applied to a label above its segment midpoint.
pub const LABEL_OFFSET_PX: f32 = 5.0;
