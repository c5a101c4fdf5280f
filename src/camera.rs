//! Camera capability contract
//!
//! Hardware-agnostic interface for camera control and data acquisition.
//! Implementations handle protocol-specific details (vendor SDK, GigE Vision,
//! simulated sensor, ...). Consumer code (acquisition controllers, GUIs) is
//! written once against [`Camera`] and works with any backend.
//!
//! Every contract operation is a required method. A driver that leaves one
//! out does not compile.
//!
//! ## Acquisition lifecycle
//!
//! ```text
//! Idle --start_single_acquisition--> SingleAcquiring --(frame done)--> Idle
//! Idle --start_live_acquisition----> LiveAcquiring   --stop---------> Idle
//! ```
//!
//! Callers poll: start an acquisition, wait for [`Camera::is_ready`], then read
//! [`Camera::acquired_data`]. See [`crate::poll`] for async helpers.

use std::fmt;

use serde::Serialize;

use crate::error::CameraResult;
use crate::frame::{Frame, FrameSize, Sample};

/// Acquisition state reported by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionState {
    /// No acquisition running; ready for a new command
    Idle,
    /// One-shot acquisition in progress
    SingleAcquiring,
    /// Continuous acquisition running
    LiveAcquiring,
}

impl AcquisitionState {
    /// Human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionState::Idle => "idle",
            AcquisitionState::SingleAcquiring => "single acquisition",
            AcquisitionState::LiveAcquiring => "live acquisition",
        }
    }
}

impl fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Camera capability trait
///
/// All methods take `&self`; drivers keep mutable state behind a lock so a
/// camera can be shared as `Arc<dyn Camera<Pixel = u16>>` between a controller
/// and a UI.
pub trait Camera: Send + Sync {
    /// Sample type of acquired frames (depends on hardware bit depth).
    type Pixel: Sample;

    /// Identifier the GUI can print: maker, model, serial number.
    ///
    /// Stable for the lifetime of the driver instance.
    fn name(&self) -> String;

    /// Sensor frame dimensions. Stable for the lifetime of the driver instance.
    fn size(&self) -> FrameSize;

    /// Whether this driver supports continuous streaming.
    fn supports_live_acquisition(&self) -> bool;

    /// Begin continuous acquisition.
    ///
    /// # Errors
    /// - `LiveAcquisitionUnsupported` if [`Camera::supports_live_acquisition`] is false
    /// - `AcquisitionInProgress` if another acquisition is running
    fn start_live_acquisition(&self) -> CameraResult<()>;

    /// Begin a one-shot acquisition.
    ///
    /// # Errors
    /// - `AcquisitionInProgress` if another acquisition is running
    fn start_single_acquisition(&self) -> CameraResult<()>;

    /// Halt any in-progress acquisition. Succeeds when already idle.
    fn stop_acquisition(&self) -> CameraResult<()>;

    /// Most recently completed frame.
    ///
    /// # Errors
    /// - `NoFrameAvailable` if no acquisition has completed yet
    fn acquired_data(&self) -> CameraResult<Frame<Self::Pixel>>;

    /// Set exposure time in seconds; returns the value actually applied.
    ///
    /// Drivers may clamp or round the request. A running single acquisition
    /// keeps the exposure it started with. During live acquisition the
    /// new exposure applies from the next frame and sets the frame period.
    ///
    /// # Errors
    /// - `InvalidParameter` for negative, NaN or infinite input
    fn set_exposure(&self, seconds: f64) -> CameraResult<f64>;

    /// Current exposure time in seconds.
    fn exposure(&self) -> f64;

    /// Set gain; returns the value actually applied.
    ///
    /// Applies the same way as [`Camera::set_exposure`]: from the next
    /// acquisition, or from the next frame while live.
    ///
    /// # Errors
    /// - `InvalidParameter` for NaN or infinite input
    fn set_gain(&self, gain: f64) -> CameraResult<f64>;

    /// Current gain.
    fn gain(&self) -> f64;

    /// Whether the camera can accept a new acquisition command now.
    fn is_ready(&self) -> bool;

    /// Current acquisition state.
    fn acquisition_state(&self) -> AcquisitionState;

    /// Whether any acquisition is running.
    fn is_acquiring(&self) -> bool {
        self.acquisition_state() != AcquisitionState::Idle
    }
}
