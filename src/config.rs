//! Client configuration

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`ClientConfig::api_url`]
pub const API_URL_ENV: &str = "ROSTER_API_URL";
/// Environment variable overriding [`ClientConfig::session_file`]
pub const SESSION_FILE_ENV: &str = "ROSTER_SESSION_FILE";
/// Session file used when none is configured
pub const DEFAULT_SESSION_FILE: &str = ".roster/session.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the records API (no trailing slash)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Where the session pair is persisted. `None` means
    /// [`DEFAULT_SESSION_FILE`]; see [`ClientConfig::session_path`].
    #[serde(default)]
    pub session_file: Option<PathBuf>,

    /// How long success notifications stay up
    #[serde(default = "default_success_notice")]
    pub success_notice_ms: u64,

    /// How long error notifications stay up
    #[serde(default = "default_error_notice")]
    pub error_notice_ms: u64,
}

// Defaults
fn default_api_url() -> String { "http://localhost:3000/api".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_success_notice() -> u64 { 3000 }
fn default_error_notice() -> u64 { 5000 }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout(),
            session_file: None,
            success_notice_ms: default_success_notice(),
            error_notice_ms: default_error_notice(),
        }
    }
}

impl ClientConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: ClientConfig = toml::from_str(content)?;
        config.api_url = config.api_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise start from defaults, then
    /// apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Resolved session file location
    pub fn session_path(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE))
    }

    /// Apply `ROSTER_API_URL` / `ROSTER_SESSION_FILE` if set.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_url = url.trim_end_matches('/').to_string();
            }
        }
        if let Ok(file) = std::env::var(SESSION_FILE_ENV) {
            if !file.trim().is_empty() {
                self.session_file = Some(PathBuf::from(file));
            }
        }
    }
}
