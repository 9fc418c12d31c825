/// Length of the pick ray cast from the camera through the cursor.
pub const MAX_RAY_DISTANCE: f32 = 1.0e9;

/// Decimal digits kept when reporting a distance.
pub const DISTANCE_DECIMALS: i32 = 3;

/// Suffix appended to every distance label.
pub const DEFAULT_UNIT_SUFFIX: &str = "cm";

/// Two presses closer together than this are a double click.
pub const DOUBLE_CLICK_SECS: f64 = 0.3;

/// Cursor travel allowed between the two presses of a double click.
pub const DOUBLE_CLICK_DRIFT_PX: f32 = 6.0;

/// Optional JSON override for the measurement settings, relative to `assets/`.
pub const SETTINGS_ASSET_PATH: &str = "measurement_settings.json";
