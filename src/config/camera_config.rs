//! Camera configuration using Figment
//!
//! Strongly-typed configuration for the `daq-camera` application and the
//! simulated camera driver. Every field has a default, so an empty or missing
//! file yields a working configuration.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::frame::{validate_payload, FrameSize, MAX_FRAME_DIMENSION};
use crate::simulated::{frame_duration, readout_duration};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/camera.toml";

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "DAQ_CAMERA_";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File or environment could not be parsed
    #[error("Configuration load error: {0}")]
    LoadError(#[from] figment::Error),
    /// Values parsed but violate a constraint
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaqCameraConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Simulated camera settings
    #[serde(default)]
    pub camera: SimulatedCameraConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

/// Simulated camera configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedCameraConfig {
    /// Identifier reported by `Camera::name`
    pub name: String,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Initial exposure time in seconds
    pub exposure_s: f64,
    /// Initial gain
    pub gain: f64,
    /// Shortest exposure the sensor accepts, in seconds
    pub min_exposure_s: f64,
    /// Longest exposure the sensor accepts, in seconds
    pub max_exposure_s: f64,
    /// Lowest gain the sensor accepts
    pub min_gain: f64,
    /// Highest gain the sensor accepts
    pub max_gain: f64,
    /// Readout time added to every exposure, in seconds
    pub readout_s: f64,
    /// Whether live (continuous) acquisition is available
    pub supports_live: bool,
}

impl Default for SimulatedCameraConfig {
    fn default() -> Self {
        Self {
            name: "Simulated Camera SIM-0001".to_string(),
            width: 512,
            height: 512,
            exposure_s: 0.1,
            gain: 1.0,
            min_exposure_s: 0.0,
            max_exposure_s: 3600.0,
            min_gain: 0.0,
            max_gain: 100.0,
            readout_s: 0.0,
            supports_live: true,
        }
    }
}

fn default_app_name() -> String {
    "daq-camera".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaqCameraConfig {
    /// Load configuration from the default location.
    ///
    /// A missing file is not an error; defaults and environment overrides
    /// still apply.
    ///
    /// # Errors
    ///
    /// Returns a ConfigError if:
    /// - The config file cannot be parsed
    /// - Configuration validation fails
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file (relative or absolute)
    ///
    /// # Errors
    ///
    /// Returns a ConfigError if the file is invalid or validation fails.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(ConfigError::LoadError)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    ///
    /// Checks:
    /// - Log level is valid (trace, debug, info, warn, error)
    /// - Camera dimensions are positive and at most 65536
    /// - Exposure and gain ranges are finite and ordered
    /// - Initial exposure and gain lie within their ranges
    /// - Readout time is non-negative
    ///
    /// # Errors
    ///
    /// Returns a ConfigError with a descriptive message for any validation failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        self.camera.validate()
    }
}

impl SimulatedCameraConfig {
    /// Validate the camera block on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "camera 'name' cannot be empty".to_string(),
            ));
        }

        for (key, value) in [("width", self.width), ("height", self.height)] {
            if value == 0 || value > MAX_FRAME_DIMENSION {
                return Err(ConfigError::ValidationError(format!(
                    "camera '{}' must be 1-{}, got {}",
                    key, MAX_FRAME_DIMENSION, value
                )));
            }
        }
        FrameSize::new(self.width, self.height)
            .and_then(validate_payload::<u16>)
            .map_err(|e| ConfigError::ValidationError(format!("camera size: {}", e)))?;

        validate_range(
            "exposure",
            self.min_exposure_s,
            self.max_exposure_s,
            self.exposure_s,
        )?;
        if self.min_exposure_s < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "camera 'min_exposure_s' must be non-negative, got {}",
                self.min_exposure_s
            )));
        }
        validate_range("gain", self.min_gain, self.max_gain, self.gain)?;

        if !self.readout_s.is_finite() || self.readout_s < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "camera 'readout_s' must be finite and non-negative, got {}",
                self.readout_s
            )));
        }
        readout_duration(self.readout_s)
            .and_then(|readout| frame_duration(self.max_exposure_s, readout))
            .map_err(|e| ConfigError::ValidationError(format!("camera timing: {}", e)))?;

        Ok(())
    }
}

fn validate_range(key: &str, min: f64, max: f64, value: f64) -> Result<(), ConfigError> {
    if !min.is_finite() || !max.is_finite() || !value.is_finite() {
        return Err(ConfigError::ValidationError(format!(
            "camera {} settings must be finite",
            key
        )));
    }
    if min > max {
        return Err(ConfigError::ValidationError(format!(
            "camera {} range is empty: min {} > max {}",
            key, min, max
        )));
    }
    if value < min || value > max {
        return Err(ConfigError::ValidationError(format!(
            "camera {} {} outside range [{}, {}]",
            key, value, min, max
        )));
    }
    Ok(())
}
