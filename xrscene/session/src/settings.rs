use serde::{Deserialize, Serialize};
use xrscene_common::LogSeverity;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ExtensionsConfig {
    pub vive_trackers: bool,
    pub palm_pose: bool,
    pub hand_interaction: bool,
    pub hand_tracking: bool,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            vive_trackers: false,
            palm_pose: true,
            hand_interaction: false,
            hand_tracking: true,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GestureConfig {
    // Maximum angle between the palm normal and the head up direction
    pub palm_up_max_angle_deg: f32,
    // Gap between the two palm spheres
    pub clap_distance_m: f32,
}

impl GestureConfig {
    pub fn palm_up_min_cos(&self) -> f32 {
        self.palm_up_max_angle_deg.to_radians().cos()
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            palm_up_max_angle_deg: 45.0,
            clap_distance_m: 0.02,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MenuConfig {
    pub columns: u32,
    pub horizontal_spacing_m: f32,
    pub vertical_spacing_m: f32,
    pub item_size_m: f32,
    pub distance_m: f32,
    pub disabled_scale: f32,
    pub hover_scale: f32,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            columns: 3,
            horizontal_spacing_m: 0.15,
            vertical_spacing_m: 0.02,
            item_size_m: 0.05,
            distance_m: 0.6,
            disabled_scale: 0.6,
            hover_scale: 1.25,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct LoggingConfig {
    // Overrides the build profile default level
    pub level: Option<LogSeverity>,
    pub log_to_disk: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub extensions: ExtensionsConfig,
    // When not empty, only these interaction profiles receive binding suggestions
    pub interaction_profile_filter: Vec<String>,
    pub gestures: GestureConfig,
    pub menu: MenuConfig,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "menu": { "columns": 4 }, "extensions": { "vive_trackers": true } }"#)
                .unwrap();

        assert_eq!(settings.menu.columns, 4);
        assert_eq!(settings.menu.item_size_m, 0.05);
        assert!(settings.extensions.vive_trackers);
        assert!(settings.extensions.palm_pose);
        assert!(settings.interaction_profile_filter.is_empty());
        assert_eq!(settings.gestures, GestureConfig::default());
    }

    #[test]
    fn palm_up_threshold_is_cos_45() {
        let cos = GestureConfig::default().palm_up_min_cos();
        assert!((cos - 0.707).abs() < 1e-3);
    }
}
