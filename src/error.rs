//! Error types for camera operations.
//!
//! `CameraError` is the single error type crossing the [`Camera`](crate::camera::Camera)
//! contract. Control operations (start/stop/set) return a [`CameraResult`] so a
//! caller learns *why* an action failed, not only that it did. Query operations
//! (`name`, `size`, `exposure`, ...) are infallible once a driver exists.
//!
//! ## Error Hierarchy
//!
//! - **`LiveAcquisitionUnsupported`**: the driver was asked to stream but does
//!   not advertise live acquisition.
//! - **`AcquisitionInProgress`**: a start command arrived while the driver was
//!   still busy with another acquisition.
//! - **`NoFrameAvailable`**: `acquired_data` was called before any frame completed.
//! - **`InvalidParameter`** / **`InvalidFrameSize`** / **`SampleCountMismatch`**:
//!   caller-supplied values the driver cannot use.
//! - **`Timeout`**: a polling helper gave up waiting on the driver.
//! - **`Hardware`**: catch-all for concrete drivers reporting device faults.

use std::time::Duration;

use thiserror::Error;

use crate::camera::AcquisitionState;

/// Convenience alias for results using the camera error type.
pub type CameraResult<T> = std::result::Result<T, CameraError>;

/// Failure reported by a camera driver or a camera helper.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    /// Live acquisition requested from a driver that does not stream
    #[error("Camera '{camera}' does not support live acquisition")]
    LiveAcquisitionUnsupported {
        /// Camera name
        camera: String,
    },

    /// Command rejected while the driver is in the given state
    #[error("Acquisition already in progress ({0})")]
    AcquisitionInProgress(AcquisitionState),

    /// No acquisition has completed yet
    #[error("No acquired frame available")]
    NoFrameAvailable,

    /// Setting value the driver cannot use
    #[error("Invalid {parameter} {value}: {reason}")]
    InvalidParameter {
        /// Setting name, e.g. `exposure`
        parameter: &'static str,
        /// Offending value
        value: f64,
        /// Violated constraint
        reason: &'static str,
    },

    /// Frame dimensions outside supported limits
    #[error("Invalid frame size {width}x{height}: {reason}")]
    InvalidFrameSize {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Violated limit
        reason: &'static str,
    },

    /// Sample buffer does not match `width * height`
    #[error("Frame sample count mismatch: expected {expected}, got {actual}")]
    SampleCountMismatch {
        /// Pixel count of the frame size
        expected: usize,
        /// Samples supplied
        actual: usize,
    },

    /// Polling helper deadline expired
    #[error("Timed out after {0:?} waiting for camera")]
    Timeout(Duration),

    /// Device fault reported by a concrete driver
    #[error("Hardware error: {0}")]
    Hardware(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CameraError::Hardware("sensor overheated".to_string());
        assert_eq!(err.to_string(), "Hardware error: sensor overheated");
    }

    #[test]
    fn test_invalid_parameter_display() {
        let err = CameraError::InvalidParameter {
            parameter: "exposure",
            value: -1.0,
            reason: "must be non-negative",
        };
        assert_eq!(err.to_string(), "Invalid exposure -1: must be non-negative");
    }

    #[test]
    fn test_in_progress_names_state() {
        let err = CameraError::AcquisitionInProgress(AcquisitionState::LiveAcquiring);
        assert!(err.to_string().contains("live acquisition"));
    }
}
