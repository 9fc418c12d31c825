use crate::engine::raycast::mesh::RaycastScope;
use bevy::asset::LoadState;
use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;
use constants::measurement::{
    DEFAULT_UNIT_SUFFIX, DOUBLE_CLICK_DRIFT_PX, DOUBLE_CLICK_SECS, MAX_RAY_DISTANCE,
    SETTINGS_ASSET_PATH,
};
use constants::render_settings::{LABEL_FONT_SIZE, LABEL_OFFSET_PX};
use serde::{Deserialize, Serialize};

/// Runtime knobs for the measurement tool.
///
/// Every field is optional in the JSON file; missing ones keep their defaults.
#[derive(Asset, TypePath, Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementSettings {
    /// Appended to distance labels after a space.
    pub unit_suffix: String,
    /// Hits further along the ray than this count as a miss.
    pub max_ray_distance: f32,
    pub raycast_scope: RaycastScope,
    pub label_font_size: f32,
    /// Screen lift of a label above its segment midpoint, in logical pixels.
    pub label_offset_px: f32,
    pub double_click_secs: f64,
    pub double_click_drift_px: f32,
    /// Aspect ratio of the rendered image when it is letterboxed inside the
    /// camera viewport.
    ///
    /// Clicks are mapped to NDC over that inner rectangle, while the pick ray
    /// still uses the camera's own projection, whose aspect Bevy derives from
    /// the full viewport. Set this only when the projection really renders
    /// into a letterboxed image of this aspect; otherwise every ray is skewed.
    pub content_aspect: Option<f32>,
}

impl Default for MeasurementSettings {
    fn default() -> Self {
        Self {
            unit_suffix: DEFAULT_UNIT_SUFFIX.to_string(),
            max_ray_distance: MAX_RAY_DISTANCE,
            raycast_scope: RaycastScope::default(),
            label_font_size: LABEL_FONT_SIZE,
            label_offset_px: LABEL_OFFSET_PX,
            double_click_secs: DOUBLE_CLICK_SECS,
            double_click_drift_px: DOUBLE_CLICK_DRIFT_PX,
            content_aspect: None,
        }
    }
}

impl MeasurementSettings {
    /// Replace values that cannot work with their defaults.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        if !(self.max_ray_distance.is_finite() && self.max_ray_distance > 0.0) {
            warn!(
                "[RULER] max_ray_distance {} invalid, using {}",
                self.max_ray_distance, defaults.max_ray_distance
            );
            self.max_ray_distance = defaults.max_ray_distance;
        }
        if !(self.label_font_size.is_finite() && self.label_font_size > 0.0) {
            warn!("[RULER] label_font_size {} invalid", self.label_font_size);
            self.label_font_size = defaults.label_font_size;
        }
        if !(self.double_click_secs.is_finite() && self.double_click_secs >= 0.0) {
            warn!("[RULER] double_click_secs {} invalid", self.double_click_secs);
            self.double_click_secs = defaults.double_click_secs;
        }
        if !(self.double_click_drift_px.is_finite() && self.double_click_drift_px >= 0.0) {
            self.double_click_drift_px = defaults.double_click_drift_px;
        }
        if !self.label_offset_px.is_finite() {
            self.label_offset_px = defaults.label_offset_px;
        }
        if self
            .content_aspect
            .is_some_and(|aspect| !(aspect.is_finite() && aspect > 0.0))
        {
            warn!("[RULER] content_aspect must be positive, ignoring");
            self.content_aspect = None;
        }

        self
    }
}

#[derive(Resource, Default)]
pub struct SettingsLoader {
    handle: Option<Handle<MeasurementSettings>>,
    applied: bool,
}

pub fn start_settings_loading(mut loader: ResMut<SettingsLoader>, asset_server: Res<AssetServer>) {
    loader.handle = Some(asset_server.load(SETTINGS_ASSET_PATH));
}

/// Swap in the file's settings once loaded. A missing or malformed file
/// leaves the defaults in place.
pub fn apply_loaded_settings(
    mut loader: ResMut<SettingsLoader>,
    asset_server: Res<AssetServer>,
    loaded: Res<Assets<MeasurementSettings>>,
    mut settings: ResMut<MeasurementSettings>,
) {
    if loader.applied {
        return;
    }
    let Some(handle) = loader.handle.clone() else {
        return;
    };

    if let Some(file_settings) = loaded.get(&handle) {
        *settings = file_settings.clone().validated();
        loader.applied = true;
        info!("[RULER] settings loaded from {SETTINGS_ASSET_PATH}");
    } else if let Some(LoadState::Failed(err)) = asset_server.get_load_state(&handle) {
        loader.applied = true;
        warn!("[RULER] using default settings: {err}");
    }
}

fn settings_pending(loader: Res<SettingsLoader>) -> bool {
    !loader.applied
}

/// Loads [`MeasurementSettings`] from `assets/measurement_settings.json`.
///
/// Requires the asset plugin. Without this plugin the defaults apply.
pub struct SettingsPlugin;

impl Plugin for SettingsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(JsonAssetPlugin::<MeasurementSettings>::new(&["json"]))
            .init_resource::<MeasurementSettings>()
            .init_resource::<SettingsLoader>()
            .add_systems(Startup, start_settings_loading)
            .add_systems(Update, apply_loaded_settings.run_if(settings_pending));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let settings: MeasurementSettings =
            serde_json::from_str(r#"{ "unit_suffix": "m", "raycast_scope": "measurable" }"#)
                .unwrap();

        assert_eq!(settings.unit_suffix, "m");
        assert_eq!(settings.raycast_scope, RaycastScope::Measurable);
        assert_eq!(settings.max_ray_distance, MAX_RAY_DISTANCE);
        assert_eq!(settings.double_click_secs, DOUBLE_CLICK_SECS);
        assert_eq!(settings.content_aspect, None);
    }

    #[test]
    fn invalid_values_fall_back() {
        let settings = MeasurementSettings {
            max_ray_distance: -1.0,
            label_font_size: 0.0,
            double_click_secs: f64::NAN,
            content_aspect: Some(0.0),
            ..default()
        }
        .validated();

        assert_eq!(settings, MeasurementSettings::default());
    }

    #[test]
    fn valid_aspect_is_kept() {
        let settings = MeasurementSettings {
            content_aspect: Some(16.0 / 9.0),
            ..default()
        }
        .validated();
        assert_eq!(settings.content_aspect, Some(16.0 / 9.0));
    }
}
