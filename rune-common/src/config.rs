//! Session configuration loading
//!
//! Config file resolution follows this priority order:
//! 1. Explicit path (command-line argument, highest priority)
//! 2. `RUNE_CONFIG` environment variable
//! 3. `<config dir>/rune/config.toml`
//! 4. Compiled defaults (fallback)
//!
//! A missing file is not an error: the session starts on defaults with a
//! warning. A file that exists but cannot be read or parsed is.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "RUNE_CONFIG";

/// Runtime configuration for a page session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Page identity of the dedicated tracks page (player expands there)
    pub tracks_page: String,
    /// Value of the `X-Requested-With` header on in-place page fetches
    pub navigation_marker: String,
    /// HTTP timeout for page, fragment and transcript fetches
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    /// Site event channel capacity
    pub event_capacity: usize,
    pub log_level: String,
    pub labels: Labels,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tracks_page: "tracks".to_string(),
            navigation_marker: "rune-pjax".to_string(),
            fetch_timeout_secs: 30,
            user_agent: concat!("rune-session/", env!("CARGO_PKG_VERSION")).to_string(),
            event_capacity: 100,
            log_level: "info".to_string(),
            labels: Labels::default(),
        }
    }
}

/// Fixed texts written into the page by the runtime
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub transcript_placeholder: String,
    pub no_transcript: String,
    pub transcript_loading: String,
    pub transcript_blank: String,
    pub transcript_error: String,
    pub toggle_expanded: String,
    pub toggle_compact: String,
    pub include_failed: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            transcript_placeholder: "open to fetch lyrics".to_string(),
            no_transcript: "(no transcript)".to_string(),
            transcript_loading: "loading lyrics…".to_string(),
            transcript_blank: "(blank transcript)".to_string(),
            transcript_error: "(error loading transcript)".to_string(),
            toggle_expanded: "collapse console".to_string(),
            toggle_compact: "open console".to_string(),
            include_failed: "Failed to load component.".to_string(),
        }
    }
}

impl SessionConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SessionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve and load configuration using the documented priority order
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path) {
            Some(path) if path.exists() => {
                info!("Loading session config from {}", path.display());
                Self::from_file(&path)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.tracks_page.trim().is_empty() {
            return Err(Error::Config("tracks_page must not be empty".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be at least 1".to_string()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(Error::Config("fetch_timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Pick the config file candidate without reading it
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    dirs::config_dir().map(|d| d.join("rune").join("config.toml"))
}
