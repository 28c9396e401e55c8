use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use tracing::{debug, info};

use crate::shared::error::{AppError, AppResult};

/// History file used when nothing else is configured, relative to the working directory.
pub const DEFAULT_HISTORY_FILE: &str = "conversion_history.csv";

/// Number of records shown as "recent conversions".
pub const DEFAULT_RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppSettings {
    pub history: HistorySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub file_path: PathBuf,
    pub recent_limit: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from(DEFAULT_HISTORY_FILE),
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl AppSettings {
    pub fn get_settings_path() -> AppResult<PathBuf> {
        ProjectDirs::from("com", "antigravity", "unit-converter")
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .ok_or_else(|| AppError::Config("Failed to determine config directory".to_string()))
    }

    /// Load from the per-user config directory, writing defaults on first run.
    pub fn load() -> AppResult<Self> {
        let path = Self::get_settings_path()?;
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            let settings = Self::default();
            settings.save_to_path(path)?;
            info!(path = %path.display(), "wrote default settings");
            return Ok(settings);
        }

        let content = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read settings file: {}", e)))?;

        let settings: Self = serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse settings: {}", e)))?;
        debug!(path = %path.display(), ?settings, "loaded settings");
        Ok(settings)
    }

    pub fn save_to_path(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)?;

        fs::write(path, content)
            .map_err(|e| AppError::Config(format!("Failed to write settings file: {}", e)))
    }
}
