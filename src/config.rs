use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

const SETTINGS_DIR: &str = "marginalia";
const SETTINGS_FILE: &str = "settings.json";

// Tuning knobs for the coordination core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Quiet period before a quick-open keystroke reaches the backend.
    pub quick_open_debounce_ms: u64,
    /// Quiet period for the search panel's file and content tabs.
    pub search_debounce_ms: u64,
    /// Files shown by quick-open before anything is typed.
    pub quick_open_fallback_limit: usize,
    /// Largest file the local filesystem will read, in bytes.
    pub max_file_size: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quick_open_debounce_ms: 200,
            search_debounce_ms: 300,
            quick_open_fallback_limit: 10,
            max_file_size: 10 * 1024 * 1024,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn quick_open_debounce(&self) -> Duration {
        Duration::from_millis(self.quick_open_debounce_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    // Per-user settings location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load settings from disk, falling back to defaults when the file is
    /// missing or malformed.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Settings::default();
        }

        match std::fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| Self::from_json(&content))
        {
            Ok(settings) => settings,
            Err(err) => {
                warn!("ignoring unreadable settings {}: {:#}", path.display(), err);
                Settings::default()
            }
        }
    }
}

// ---- Tests ----
