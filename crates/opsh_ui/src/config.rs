//! UI configuration loaded from `config.toml` (or `.json`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::picker::DEFAULT_PAGE_SIZE;

/// Settings for the prompt, history, picker and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Header printed before the command line
    pub prompt: String,
    /// Glyph drawn for each character of a masked answer
    pub mask_glyph: char,
    /// History file; in-memory history when unset
    pub history_file: Option<PathBuf>,
    pub history_limit: usize,
    /// Rows per picker page
    pub page_size: usize,
    /// Delay before the completion busy marker appears
    pub busy_debounce_ms: u64,
    /// Length of the visual bell on an empty submit
    pub blink_ms: u64,
    /// Default log filter when `OPSH_LOG` is unset
    pub log_level: String,
    /// Directory for log files; no file logging when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            prompt: "opsh> ".to_string(),
            mask_glyph: '*',
            history_file: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            page_size: DEFAULT_PAGE_SIZE,
            busy_debounce_ms: 350,
            blink_ms: 120,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl UiConfig {
    /// Load from `path`. `.json` files are read as JSON, anything else as TOML.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content).context("Failed to parse JSON config file")
        } else {
            toml::from_str(&content).context("Failed to parse TOML config file")
        }
    }

    /// `<config dir>/opsh/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("opsh").join("config.toml"))
    }

    /// `<data dir>/opsh/history.json`
    pub fn default_history_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("opsh").join("history.json"))
    }

    /// `<data dir>/opsh/logs`
    pub fn default_log_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("opsh").join("logs"))
    }

    /// Load `path` if given, else the default location. A missing default
    /// file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::load_from_file(path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn busy_debounce(&self) -> Duration {
        Duration::from_millis(self.busy_debounce_ms)
    }

    pub fn blink(&self) -> Duration {
        Duration::from_millis(self.blink_ms)
    }
}
