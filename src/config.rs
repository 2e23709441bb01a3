//! Application configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;
use tracing::warn;
use url::Url;

use crate::errors::BoatTrackerError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub tracker: TrackerConfig,
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Base URL of the JSON API, e.g. `https://www.boat-tracker.com/api`
    pub api_url: String,
    /// Base URL of the socket endpoint, e.g. `wss://www.boat-tracker.com`
    pub ws_url: String,
    #[serde(default = "default_language")]
    pub language: String,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    /// Maximum number of AIS samples kept per vessel
    #[serde(default = "default_vessel_history_len")]
    pub vessel_history_len: usize,
    /// Padding in screen points when framing all points
    #[serde(default = "default_fit_padding")]
    pub fit_padding: f64,
    /// Camera pitch used the first time the camera follows a track
    #[serde(default = "default_initial_pitch")]
    pub initial_pitch: f64,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: Duration,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Track to follow when running the headless client
    #[serde(default)]
    pub track: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CredentialsConfig {
    pub path: PathBuf,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_vessel_history_len() -> usize {
    200
}

fn default_fit_padding() -> f64 {
    60.0
}

fn default_initial_pitch() -> f64 {
    60.0
}

fn default_reconnect_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            vessel_history_len: default_vessel_history_len(),
            fit_padding: default_fit_padding(),
            initial_pitch: default_initial_pitch(),
            reconnect_delay: default_reconnect_delay(),
            channel_capacity: default_channel_capacity(),
            track: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("BOATTRACKER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<(), BoatTrackerError> {
        self.backend.validate()?;
        self.tracker.validate()?;
        self.credentials.validate()?;
        Ok(())
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<(), BoatTrackerError> {
        for (name, value) in [("api_url", &self.api_url), ("ws_url", &self.ws_url)] {
            if value.is_empty() {
                return Err(BoatTrackerError::ConfigurationError {
                    message: format!("Backend {} cannot be empty", name),
                });
            }
            Url::parse(value).map_err(|e| BoatTrackerError::ConfigurationError {
                message: format!("Backend {} is not a valid URL: {}", name, e),
            })?;
        }
        Ok(())
    }

    /// Host name used to key stored credentials
    pub fn host(&self) -> Result<String, BoatTrackerError> {
        let url = Url::parse(&self.api_url)?;
        url.host_str()
            .map(str::to_string)
            .ok_or_else(|| BoatTrackerError::ConfigurationError {
                message: format!("Backend api_url has no host: {}", self.api_url),
            })
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), BoatTrackerError> {
        if self.vessel_history_len == 0 {
            return Err(BoatTrackerError::ConfigurationError {
                message: "Vessel history length must be greater than zero".to_string(),
            });
        }
        if self.channel_capacity == 0 {
            return Err(BoatTrackerError::ConfigurationError {
                message: "Channel capacity must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl CredentialsConfig {
    pub fn validate(&self) -> Result<(), BoatTrackerError> {
        if self.path.to_str().unwrap_or("").is_empty() {
            return Err(BoatTrackerError::ConfigurationError {
                message: "Credentials path cannot be empty".to_string(),
            });
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                self.ensure_directory_exists(parent)?;
            }
        }
        Ok(())
    }

    fn ensure_directory_exists(&self, dir: &Path) -> Result<(), BoatTrackerError> {
        if !dir.exists() {
            warn!("Credentials directory does not exist, attempting to create it");
            std::fs::create_dir_all(dir).map_err(|e| BoatTrackerError::ConfigurationError {
                message: format!("Could not create credentials directory: {}", e),
            })?;
        }
        Ok(())
    }
}
