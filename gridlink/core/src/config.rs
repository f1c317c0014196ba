//! Core Configuration
//!
//! Tunables for the session core, loadable from a TOML file or environment
//! variables. Everything has a sensible default; a missing config file is
//! not an error.
//!
//! # Environment Variables
//!
//! - `GRIDLINK_REFUSAL_GRACE_MS`: delay before a refused offer's channel is
//!   closed, in milliseconds
//! - `GRIDLINK_SURFACE_CAPACITY`: capacity of the surface message channel
//! - `GRIDLINK_INVITE_PARAM`: query parameter carrying the session id
//! - `GRIDLINK_INVITE_BASE`: base URL that invite links are built on

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

fn default_refusal_grace_ms() -> u64 {
    500
}

fn default_surface_capacity() -> usize {
    100
}

fn default_invite_param() -> String {
    "game".to_string()
}

fn default_invite_base() -> String {
    "https://gridlink.example/play".to_string()
}

/// Session core configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Grace period before a refused offer's channel is closed, giving the
    /// refusal payload time to flush (milliseconds).
    #[serde(default = "default_refusal_grace_ms")]
    pub refusal_grace_ms: u64,

    /// Capacity of the surface message channel.
    #[serde(default = "default_surface_capacity")]
    pub surface_capacity: usize,

    /// Query parameter carrying the host's session id in invite URLs.
    #[serde(default = "default_invite_param")]
    pub invite_param: String,

    /// Base URL that invite links are built on.
    #[serde(default = "default_invite_base")]
    pub invite_base: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            refusal_grace_ms: default_refusal_grace_ms(),
            surface_capacity: default_surface_capacity(),
            invite_param: default_invite_param(),
            invite_base: default_invite_base(),
        }
    }
}

impl CoreConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            refusal_grace_ms: std::env::var("GRIDLINK_REFUSAL_GRACE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.refusal_grace_ms),
            surface_capacity: std::env::var("GRIDLINK_SURFACE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.surface_capacity),
            invite_param: std::env::var("GRIDLINK_INVITE_PARAM")
                .unwrap_or(defaults.invite_param),
            invite_base: std::env::var("GRIDLINK_INVITE_BASE").unwrap_or(defaults.invite_base),
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Default config file location: `<config dir>/gridlink/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gridlink").join("config.toml"))
    }

    /// Load from the default location, or defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Fails only when a file exists but cannot be read or parsed.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// The refusal grace period as a [`Duration`].
    #[must_use]
    pub fn refusal_grace(&self) -> Duration {
        Duration::from_millis(self.refusal_grace_ms)
    }
}
