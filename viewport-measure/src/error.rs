use thiserror::Error;

/// Why a click produced no pick ray.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoRayReason {
    /// Cursor left the window, or the window reported no cursor.
    #[error("cursor outside window")]
    OutsideWindow,
    /// Cursor is inside the window but in the letterbox bars around the rendered image.
    #[error("cursor outside viewport rectangle")]
    OutsideViewport,
    /// Normalized coordinates fell outside `[-1, 1]`.
    #[error("coordinate outside normalized device range")]
    OutsideNdc,
    /// Camera matrices could not be inverted or produced a zero-length ray.
    #[error("camera matrices are not invertible")]
    DegenerateCamera,
}

/// Non-fatal outcomes of a single measurement click.
///
/// Both variants leave the measurement untouched; they are kept apart so the
/// log tells "bad input" from "empty scene under the cursor".
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickError {
    #[error("no pick ray: {0}")]
    NoRay(NoRayReason),

    #[error("ray hit no geometry")]
    NoHit,
}

pub type PickResult<T> = Result<T, PickError>;
