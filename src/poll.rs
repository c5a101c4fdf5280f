//! Async polling helpers for camera consumers.
//!
//! The [`Camera`] contract is synchronous and has no completion callbacks, so
//! callers poll [`Camera::is_ready`] and [`Camera::acquired_data`]. These
//! helpers do that on tokio without blocking the runtime:
//!
//! ```rust
//! use daq_camera::poll::{snap, PollOptions};
//! use daq_camera::SimulatedCamera;
//!
//! #[tokio::main]
//! async fn main() -> daq_camera::CameraResult<()> {
//!     let camera = SimulatedCamera::builder().exposure(0.01).build()?;
//!     let frame = snap(&camera, &PollOptions::default()).await?;
//!     println!("mean intensity: {:.1}", frame.stats().mean);
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::camera::Camera;
use crate::error::{CameraError, CameraResult};
use crate::frame::Frame;

/// Polling cadence and deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between two polls
    pub interval: Duration,
    /// Give up after this long
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5),
            timeout: Duration::from_secs(10),
        }
    }
}

impl PollOptions {
    /// Replace the overall deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the delay between polls.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Wait until the camera reports ready.
///
/// # Errors
/// - `Timeout` if the camera is still busy after `options.timeout`
pub async fn wait_until_ready<C: Camera + ?Sized>(
    camera: &C,
    options: &PollOptions,
) -> CameraResult<()> {
    let deadline = Instant::now() + options.timeout;
    while !camera.is_ready() {
        if Instant::now() >= deadline {
            return Err(CameraError::Timeout(options.timeout));
        }
        sleep(options.interval).await;
    }
    Ok(())
}

/// Acquire one frame: start a single acquisition, wait for it, read it.
pub async fn snap<C: Camera + ?Sized>(
    camera: &C,
    options: &PollOptions,
) -> CameraResult<Frame<C::Pixel>> {
    camera.start_single_acquisition()?;
    if let Err(err) = wait_until_ready(camera, options).await {
        warn!(camera = %camera.name(), "snap timed out, aborting acquisition");
        camera.stop_acquisition()?;
        return Err(err);
    }
    camera.acquired_data()
}

/// Run live acquisition until `count` distinct frames were read, then stop.
///
/// Frames are distinguished by frame number; a poll that returns the frame
/// seen last time is not counted. Live acquisition is stopped on every exit
/// path once started.
///
/// # Errors
/// - `LiveAcquisitionUnsupported` / `AcquisitionInProgress` from the start command
/// - `Timeout` if fewer than `count` frames arrived within `options.timeout`
pub async fn collect_live<C: Camera + ?Sized>(
    camera: &C,
    count: usize,
    options: &PollOptions,
) -> CameraResult<Vec<Frame<C::Pixel>>> {
    camera.start_live_acquisition()?;
    let result = collect_started(camera, count, options).await;
    let stopped = camera.stop_acquisition();
    let frames = result?;
    stopped?;
    Ok(frames)
}

async fn collect_started<C: Camera + ?Sized>(
    camera: &C,
    count: usize,
    options: &PollOptions,
) -> CameraResult<Vec<Frame<C::Pixel>>> {
    let deadline = Instant::now() + options.timeout;
    let mut seen = HashSet::new();
    let mut frames = Vec::with_capacity(count);

    while frames.len() < count {
        match camera.acquired_data() {
            Ok(frame) => {
                if seen.insert(frame.metadata.frame_number) {
                    debug!(frame_number = frame.metadata.frame_number, "live frame collected");
                    frames.push(frame);
                    continue;
                }
            }
            Err(CameraError::NoFrameAvailable) => {}
            Err(err) => return Err(err),
        }

        if Instant::now() >= deadline {
            return Err(CameraError::Timeout(options.timeout));
        }
        sleep(options.interval).await;
    }

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::AcquisitionState;
    use crate::simulated::SimulatedCamera;

    fn fast_options() -> PollOptions {
        PollOptions::default()
            .with_interval(Duration::from_millis(1))
            .with_timeout(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_snap_returns_frame() {
        let camera = SimulatedCamera::builder()
            .size(32, 32)
            .exposure(0.02)
            .build()
            .unwrap();

        let frame = snap(&camera, &fast_options()).await.unwrap();
        assert_eq!(frame.size().as_tuple(), (32, 32));
        assert_eq!(frame.metadata.frame_number, 0);
        assert!(camera.is_ready());
    }

    #[tokio::test]
    async fn test_snap_times_out_and_aborts() {
        let camera = SimulatedCamera::builder()
            .size(8, 8)
            .exposure(30.0)
            .build()
            .unwrap();
        let options = fast_options().with_timeout(Duration::from_millis(20));

        let err = snap(&camera, &options).await.unwrap_err();
        assert_eq!(err, CameraError::Timeout(Duration::from_millis(20)));
        assert_eq!(camera.acquisition_state(), AcquisitionState::Idle);
    }

    #[tokio::test]
    async fn test_collect_live_distinct_frames() {
        let camera = SimulatedCamera::builder()
            .size(8, 8)
            .exposure(0.002)
            .build()
            .unwrap();

        let frames = collect_live(&camera, 3, &fast_options()).await.unwrap();
        assert_eq!(frames.len(), 3);
        let numbers: Vec<u64> = frames.iter().map(|f| f.metadata.frame_number).collect();
        assert!(numbers.windows(2).all(|w| w[0] < w[1]));
        assert!(camera.is_ready());
    }

    #[tokio::test]
    async fn test_collect_live_unsupported() {
        let camera = SimulatedCamera::builder()
            .supports_live(false)
            .build()
            .unwrap();

        let err = collect_live(&camera, 1, &fast_options()).await.unwrap_err();
        assert!(matches!(err, CameraError::LiveAcquisitionUnsupported { .. }));
    }

    #[tokio::test]
    async fn test_wait_until_ready_when_idle() {
        let camera = SimulatedCamera::new();
        wait_until_ready(&camera, &fast_options()).await.unwrap();
    }
}
