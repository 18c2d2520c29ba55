//! Client settings: defaults, optional TOML file, then environment overrides.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::monitor::HEALTH_POLL_INTERVAL;

pub const DEFAULT_CONFIG_FILE: &str = "detector.toml";
pub const API_URL_ENV_VARS: [&str; 2] = ["DETECTOR_API_URL", "APP__API_BASE_URL"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: String,
    pub health_poll_interval_secs: u64,
    pub default_confidence: f32,
    pub request_timeout_secs: u64,
    pub batch_chunk_size: usize,
    pub max_file_size_mb: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".into(),
            health_poll_interval_secs: HEALTH_POLL_INTERVAL.as_secs(),
            default_confidence: 0.25,
            request_timeout_secs: 600,
            batch_chunk_size: 50,
            max_file_size_mb: 10,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("api_base_url '{url}' is not a valid http(s) url")]
    InvalidUrl { url: String },
    #[error("default_confidence must be within 0..=1, got {0}")]
    InvalidConfidence(f32),
    #[error("health_poll_interval_secs must be greater than zero")]
    InvalidPollInterval,
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        let parsed = Url::parse(&self.api_base_url).map_err(|_| SettingsError::InvalidUrl {
            url: self.api_base_url.clone(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SettingsError::InvalidUrl {
                url: self.api_base_url.clone(),
            });
        }
        if !(0.0..=1.0).contains(&self.default_confidence) {
            return Err(SettingsError::InvalidConfidence(self.default_confidence));
        }
        if self.health_poll_interval_secs == 0 {
            return Err(SettingsError::InvalidPollInterval);
        }
        Ok(())
    }

    pub fn with_api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = api_base_url.into();
        self
    }

    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_secs(self.health_poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Loads settings from `explicit_path` (which must exist) or from
/// [`DEFAULT_CONFIG_FILE`] in the working directory (which may be absent),
/// then applies the base URL environment overrides.
pub fn load_settings(explicit_path: Option<&Path>) -> Result<Settings, SettingsError> {
    let mut settings = match explicit_path {
        Some(path) => read_settings_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                read_settings_file(default_path)?
            } else {
                Settings::default()
            }
        }
    };

    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.validate()?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<Settings, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Later entries of [`API_URL_ENV_VARS`] win. Blank values are ignored.
pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    for name in API_URL_ENV_VARS {
        if let Some(value) = lookup(name) {
            let value = value.trim();
            if !value.is_empty() {
                settings.api_base_url = value.to_string();
            }
        }
    }
}
