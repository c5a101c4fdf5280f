//! Configuration System
//!
//! This module provides configuration management using Figment.
//!
//! # Configuration Sources
//!
//! Configuration is loaded from (in order of precedence):
//! 1. Environment variables prefixed with `DAQ_CAMERA_`
//! 2. TOML configuration file (default: `config/camera.toml`)
//! 3. Built-in defaults
//!
//! # Example
//!
//! ```no_run
//! use daq_camera::config::DaqCameraConfig;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DaqCameraConfig::load()?;
//!
//!     println!("App name: {}", config.application.name);
//!     println!("Camera: {} ({}x{})", config.camera.name, config.camera.width, config.camera.height);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Environment Variables
//!
//! Nested keys are separated by a double underscore:
//!
//! ```text
//! DAQ_CAMERA_APPLICATION__LOG_LEVEL=debug
//! DAQ_CAMERA_CAMERA__EXPOSURE_S=0.02
//! DAQ_CAMERA_CAMERA__SUPPORTS_LIVE=false
//! ```

pub mod camera_config;

pub use camera_config::{ApplicationConfig, ConfigError, DaqCameraConfig, SimulatedCameraConfig};
