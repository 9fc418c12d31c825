use crate::error::NoRayReason;
use bevy::prelude::*;

/// Screen-space layout of the rendered image inside its viewport.
///
/// The rendered image keeps its own aspect ratio and is letterboxed (bars top
/// and bottom) or pillarboxed (bars left and right) when the viewport does not
/// match it. Clicks on the bars have no ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportGeometry {
    /// Top-left corner of the viewport in window logical pixels.
    pub origin: Vec2,
    /// Viewport extent in logical pixels.
    pub size: Vec2,
    /// Aspect ratio (width / height) of the rendered image. `None` means the
    /// image fills the viewport exactly.
    pub content_aspect: Option<f32>,
}

impl ViewportGeometry {
    pub fn new(size: Vec2) -> Self {
        Self {
            origin: Vec2::ZERO,
            size,
            content_aspect: None,
        }
    }

    pub fn with_content_aspect(mut self, aspect: Option<f32>) -> Self {
        self.content_aspect = aspect.filter(|a| a.is_finite() && *a > 0.0);
        self
    }

    /// Build from the camera's logical viewport, falling back to the whole window.
    pub fn from_camera(camera: &Camera, window: &Window) -> Self {
        match camera.logical_viewport_rect() {
            Some(rect) => Self {
                origin: rect.min,
                size: rect.size(),
                content_aspect: None,
            },
            None => Self::new(window.size()),
        }
    }

    /// Rectangle covered by the rendered image, relative to the viewport origin.
    pub fn content_rect(&self) -> Option<Rect> {
        let (width, height) = (self.size.x, self.size.y);
        if !(width > 0.0 && height > 0.0) {
            return None;
        }

        let viewport_aspect = width / height;
        let aspect = self.content_aspect.unwrap_or(viewport_aspect);

        if aspect > viewport_aspect {
            // Image is wider than the viewport: full width, bars above and below.
            let content_height = width / aspect;
            let bar = (height - content_height) * 0.5;
            Some(Rect::new(0.0, bar, width, height - bar))
        } else {
            let content_width = height * aspect;
            let bar = (width - content_width) * 0.5;
            Some(Rect::new(bar, 0.0, width - bar, height))
        }
    }

    /// Map a cursor position (window logical pixels, origin top-left, y down)
    /// to normalized device coordinates (`[-1, 1]`, y up).
    pub fn cursor_to_ndc(&self, cursor: Vec2) -> Result<Vec2, NoRayReason> {
        let local = cursor - self.origin;
        if !local.is_finite()
            || local.x < 0.0
            || local.y < 0.0
            || local.x > self.size.x
            || local.y > self.size.y
        {
            return Err(NoRayReason::OutsideWindow);
        }

        let rect = self.content_rect().ok_or(NoRayReason::OutsideWindow)?;
        if !rect.contains(local) {
            return Err(NoRayReason::OutsideViewport);
        }

        // Horizontal extent for x, vertical extent for y.
        let mx = (local.x - rect.min.x) / rect.width();
        let my = (local.y - rect.min.y) / rect.height();

        Ok(Vec2::new(mx * 2.0 - 1.0, -(my * 2.0 - 1.0)))
    }
}
