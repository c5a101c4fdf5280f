//! Camera capability contract for the DAQ system.
//!
//! This library defines the [`Camera`] trait that every camera driver
//! implements, the [`Frame`] types that cross it, and tools built on top of
//! the contract: a software [`SimulatedCamera`], conformance checks for any
//! driver, and async polling helpers for acquisition controllers and GUIs.

pub mod camera;
pub mod config;
pub mod error;
pub mod frame;
pub mod poll;
pub mod simulated;
pub mod testing;

pub use camera::{AcquisitionState, Camera};
pub use error::{CameraError, CameraResult};
pub use frame::{Frame, FrameMetadata, FrameSize, FrameStats, Sample};
pub use simulated::{SimulatedCamera, SimulatedCameraBuilder};
