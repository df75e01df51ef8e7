// Application settings
// Loaded from ~/.config/fxbar/settings.json

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `suggest.url`.
pub const URL_ENV_VAR: &str = "FXBAR_AUTOCOMPLETE_URL";

const DEFAULT_CONFIG: &str = r#"{
    // Suggestion endpoint (GET, returns a JSON list of tags)
    // FXBAR_AUTOCOMPLETE_URL and --url take precedence over this value
    "suggest.url": null,

    // Reuse fetched suggestions for this many seconds
    "suggest.staleTimeSecs": 300,

    // Request timeout
    "suggest.timeoutSecs": 15,

    // Editor
    "editor.showInstructions": true
}
"#;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Suggestions
    #[serde(rename = "suggest.url")]
    pub suggest_url: Option<String>,

    #[serde(rename = "suggest.staleTimeSecs")]
    pub stale_time_secs: u64,

    #[serde(rename = "suggest.timeoutSecs")]
    pub timeout_secs: u64,

    // Editor
    #[serde(rename = "editor.showInstructions")]
    pub show_instructions: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            suggest_url: None,
            stale_time_secs: 300,
            timeout_secs: 15,
            show_instructions: true,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fxbar");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path. A missing file is created with commented defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            let settings = Self::default();
            Self::create_default_file(path);
            return settings;
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Error parsing {}: {}", path.display(), e);
                    log::warn!("Using default settings");
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON, ignoring lines that start with `//`.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        serde_json::from_str(&cleaned).map_err(|e| e.to_string())
    }

    fn create_default_file(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {}", e);
                return;
            }
        }

        if let Err(e) = fs::write(path, DEFAULT_CONFIG) {
            log::warn!("Error writing default settings.json: {}", e);
        }
    }

    /// Endpoint URL after overrides: `cli_override`, then the environment, then the file.
    pub fn effective_url(&self, cli_override: Option<&str>) -> Option<String> {
        self.resolve_url(cli_override, std::env::var(URL_ENV_VAR).ok().as_deref())
    }

    /// Precedence without touching the process environment. Blank values are skipped.
    pub fn resolve_url(&self, cli_override: Option<&str>, env_value: Option<&str>) -> Option<String> {
        [cli_override, env_value, self.suggest_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .map(str::to_string)
    }

    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}
