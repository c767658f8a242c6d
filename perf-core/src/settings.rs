use identity::HistoryType;
use metric::RefreshWindow;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MIN_REFRESH_RATE_SECS: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerfSettings {
    pub refresh_rate_secs: u64,
    pub time_window_secs: u64,
    pub default_history: HistoryType,
    pub include_zero: bool,
    pub sleep_when_hidden: bool,
    pub undo_limit: usize,
}

impl Default for PerfSettings {
    fn default() -> Self {
        let window = RefreshWindow::default();
        Self {
            refresh_rate_secs: window.refresh_rate_secs,
            time_window_secs: window.time_window_secs,
            default_history: HistoryType::Current,
            include_zero: true,
            sleep_when_hidden: true,
            undo_limit: crate::undo::DEFAULT_UNDO_LIMIT,
        }
    }
}

impl PerfSettings {
    pub fn window(&self) -> RefreshWindow {
        RefreshWindow::new(self.refresh_rate_secs, self.time_window_secs)
    }

    pub fn apply_json(&mut self, json: &str) -> Result<(), String> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid JSON: {e}"))?;
        self.apply_patch(&value)
    }

    /// Applies the keys present in `patch`; the settings are untouched if
    /// any value is invalid.
    pub fn apply_patch(&mut self, patch: &serde_json::Value) -> Result<(), String> {
        let obj = patch
            .as_object()
            .ok_or_else(|| "Settings patch must be a JSON object".to_string())?;

        let mut settings = self.clone();
        if let Some(value) = obj.get("refresh_rate_secs") {
            settings.refresh_rate_secs = value
                .as_u64()
                .ok_or_else(|| "refresh_rate_secs must be a positive integer".to_string())?;
        }
        if let Some(value) = obj.get("time_window_secs") {
            settings.time_window_secs = value
                .as_u64()
                .ok_or_else(|| "time_window_secs must be a positive integer".to_string())?;
        }
        if let Some(value) = obj.get("default_history") {
            let key = value
                .as_str()
                .ok_or_else(|| "default_history must be a string".to_string())?;
            settings.default_history = HistoryType::from_key(key)
                .ok_or_else(|| format!("unknown history type '{key}'"))?;
        }
        if let Some(value) = obj.get("include_zero") {
            settings.include_zero = value
                .as_bool()
                .ok_or_else(|| "include_zero must be a boolean".to_string())?;
        }
        if let Some(value) = obj.get("sleep_when_hidden") {
            settings.sleep_when_hidden = value
                .as_bool()
                .ok_or_else(|| "sleep_when_hidden must be a boolean".to_string())?;
        }
        if let Some(value) = obj.get("undo_limit") {
            settings.undo_limit = value
                .as_u64()
                .ok_or_else(|| "undo_limit must be a positive integer".to_string())?
                as usize;
        }

        *self = normalize_settings(settings);
        Ok(())
    }
}

pub fn normalize_settings(mut settings: PerfSettings) -> PerfSettings {
    settings.refresh_rate_secs = settings.refresh_rate_secs.max(MIN_REFRESH_RATE_SECS);
    settings.time_window_secs = settings.time_window_secs.max(settings.refresh_rate_secs);
    settings.undo_limit = settings.undo_limit.max(1);
    settings
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("toml")
}

/// Reads settings from TOML (`.toml`) or JSON (anything else).
pub fn load_settings_file(path: &Path) -> Result<PerfSettings, String> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read settings file '{}': {e}", path.display()))?;
    let settings: PerfSettings = if is_toml(path) {
        toml::from_str(&data)
            .map_err(|e| format!("Failed to parse settings file '{}': {e}", path.display()))?
    } else {
        serde_json::from_str(&data)
            .map_err(|e| format!("Failed to parse settings file '{}': {e}", path.display()))?
    };
    Ok(normalize_settings(settings))
}

pub fn save_settings_file(path: &Path, settings: &PerfSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let data = if is_toml(path) {
        toml::to_string_pretty(settings)
            .map_err(|e| format!("Failed to serialize settings: {e}"))?
    } else {
        serde_json::to_string_pretty(settings)
            .map_err(|e| format!("Failed to serialize settings: {e}"))?
    };
    std::fs::write(path, data)
        .map_err(|e| format!("Failed to write settings file '{}': {e}", path.display()))
}
