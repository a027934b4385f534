mod settings;

pub use settings::*;

use serde_json as json;
use std::{fs, path::Path};
use xrscene_common::anyhow::{Context, Result};

pub const SETTINGS_FNAME: &str = "settings.json";

pub fn load_settings(path: &Path) -> Result<Settings> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read settings file {}", path.display()))?;

    Ok(json::from_str(&text)?)
}

pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    fs::write(path, json::to_string_pretty(settings)?)
        .with_context(|| format!("Cannot write settings file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_file_roundtrip() {
        let dir = std::env::temp_dir().join(format!("xrscene_session_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(SETTINGS_FNAME);

        let mut settings = Settings::default();
        settings.interaction_profile_filter =
            vec!["/interaction_profiles/khr/simple_controller".into()];
        settings.extensions.vive_trackers = true;

        save_settings(&settings, &path).unwrap();
        let loaded = load_settings(&path).unwrap();

        assert_eq!(loaded, settings);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_error() {
        assert!(load_settings(Path::new("/nonexistent/xrscene/settings.json")).is_err());
    }
}
