use crate::domain::models::MotionMode;
use crate::infrastructure::bluetooth::protocol;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_true(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_true(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "simple_mouse_link".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // Motion
    #[serde(default = "default_motion_mode")]
    pub motion_mode: MotionMode,
    #[serde(default = "default_velocity_gain")]
    pub velocity_gain: f64,
    #[serde(default = "default_move_gain")]
    pub move_gain: f64,
    #[serde(default = "default_sample_period_ms")]
    pub sample_period_ms: u64,

    // BLE
    #[serde(default = "default_service_uuid")]
    pub ble_service_uuid: String,
    #[serde(default = "default_move_uuid")]
    pub ble_move_char_uuid: String,
    #[serde(default = "default_velocity_uuid")]
    pub ble_velocity_char_uuid: String,
    #[serde(default = "default_buttons_uuid")]
    pub ble_buttons_char_uuid: String,
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// Selection window; no match within it counts as a cancelled selection
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,

    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            motion_mode: default_motion_mode(),
            velocity_gain: default_velocity_gain(),
            move_gain: default_move_gain(),
            sample_period_ms: default_sample_period_ms(),
            ble_service_uuid: default_service_uuid(),
            ble_move_char_uuid: default_move_uuid(),
            ble_velocity_char_uuid: default_velocity_uuid(),
            ble_buttons_char_uuid: default_buttons_uuid(),
            device_name: default_device_name(),
            scan_timeout_ms: default_scan_timeout_ms(),
            log_settings: LogSettings::default(),
        }
    }
}

fn default_motion_mode() -> MotionMode {
    MotionMode::Velocity
}
fn default_velocity_gain() -> f64 {
    2000.0
}
fn default_move_gain() -> f64 {
    100.0
}
fn default_sample_period_ms() -> u64 {
    100
}
fn default_service_uuid() -> String {
    protocol::SERVICE_UUID.to_string()
}
fn default_move_uuid() -> String {
    protocol::MOVE_XY_CHAR_UUID.to_string()
}
fn default_velocity_uuid() -> String {
    protocol::VELOCITY_XY_CHAR_UUID.to_string()
}
fn default_buttons_uuid() -> String {
    protocol::BUTTONS_CHAR_UUID.to_string()
}
fn default_device_name() -> String {
    protocol::DEVICE_NAME.to_string()
}
fn default_scan_timeout_ms() -> u64 {
    10_000
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::with_path(settings_path))
    }

    /// Load from an explicit file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn with_path(settings_path: PathBuf) -> Self {
        let settings = match Self::load_from_file(&settings_path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::debug!(
                    "Using default settings ({}): {}",
                    settings_path.display(),
                    e
                );
                Settings::default()
            }
        };

        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("SimpleMouseLink");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_is_filled_with_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "motion_mode": "sampled_delta", "move_gain": 50.0 }"#)
                .unwrap();

        assert_eq!(settings.motion_mode, MotionMode::SampledDelta);
        assert_eq!(settings.move_gain, 50.0);
        assert_eq!(settings.velocity_gain, 2000.0);
        assert_eq!(settings.sample_period_ms, 100);
        assert_eq!(settings.device_name, "Simple Mouse Link");
        assert_eq!(settings.log_settings.rotation, "daily");
    }

    #[test]
    fn missing_file_falls_back_to_defaults_and_save_round_trips() {
        let dir = std::env::temp_dir().join(format!("sml-settings-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        let _ = fs::remove_file(&path);

        let mut service = SettingsService::with_path(path.clone());
        assert_eq!(service.get().motion_mode, MotionMode::Velocity);

        service.settings.motion_mode = MotionMode::SampledDelta;
        service.save().unwrap();

        let reloaded = SettingsService::with_path(path);
        assert_eq!(reloaded.get().motion_mode, MotionMode::SampledDelta);

        let _ = fs::remove_dir_all(&dir);
    }
}
