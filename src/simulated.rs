//! Simulated camera driver
//!
//! Software implementation of the [`Camera`] contract for testing without
//! physical hardware. Timing is computed from a monotonic clock on every call,
//! so no background task is needed:
//!
//! - a single acquisition completes once `exposure + readout` has elapsed
//! - live acquisition completes a frame every `max(exposure + readout, 1ms)`
//!
//! Frames carry a deterministic diagonal gradient scaled by gain and shifted by
//! frame number.
//!
//! # Example
//!
//! ```rust
//! use daq_camera::{Camera, SimulatedCamera};
//!
//! let camera = SimulatedCamera::builder()
//!     .size(64, 48)
//!     .exposure(0.0)
//!     .build()
//!     .unwrap();
//! camera.start_single_acquisition().unwrap();
//! assert!(camera.is_ready());
//! let frame = camera.acquired_data().unwrap();
//! assert_eq!(frame.size().as_tuple(), (64, 48));
//! ```

use std::time::{Duration, Instant};

use chrono::{TimeDelta, Utc};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::camera::{AcquisitionState, Camera};
use crate::config::SimulatedCameraConfig;
use crate::error::{CameraError, CameraResult};
use crate::frame::{validate_payload, Frame, FrameMetadata, FrameSize};

/// Shortest live frame period.
const MIN_LIVE_PERIOD: Duration = Duration::from_millis(1);

/// Exposure and gain captured for an acquisition.
#[derive(Debug, Clone, Copy)]
struct Settings {
    exposure_s: f64,
    gain: f64,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Idle,
    Single {
        started: Instant,
        duration: Duration,
        settings: Settings,
    },
    Live {
        started: Instant,
        period: Duration,
        emitted: u64,
        settings: Settings,
    },
}

#[derive(Debug)]
struct SimulatedState {
    settings: Settings,
    mode: Mode,
    last_frame: Option<Frame<u16>>,
    next_frame_number: u64,
}

/// Simulated camera producing `u16` frames.
///
/// A running single acquisition keeps the exposure and gain it started with.
/// During live acquisition a gain change applies from the next frame, and an
/// exposure change restarts the frame clock with the new period.
#[derive(Debug)]
pub struct SimulatedCamera {
    name: String,
    size: FrameSize,
    exposure_range: (f64, f64),
    gain_range: (f64, f64),
    readout: Duration,
    supports_live: bool,
    state: Mutex<SimulatedState>,
}

impl SimulatedCamera {
    /// Camera with the default settings: 512x512, 0.1s exposure, gain 1.0.
    pub fn new() -> Self {
        Self::builder().assemble(DEFAULT_SIZE, Duration::ZERO)
    }

    /// Start building a camera with custom settings.
    pub fn builder() -> SimulatedCameraBuilder {
        SimulatedCameraBuilder::default()
    }

    /// Build a camera from its configuration block.
    pub fn from_config(config: &SimulatedCameraConfig) -> CameraResult<Self> {
        Self::builder()
            .name(config.name.clone())
            .size(config.width, config.height)
            .exposure(config.exposure_s)
            .gain(config.gain)
            .exposure_range(config.min_exposure_s, config.max_exposure_s)
            .gain_range(config.min_gain, config.max_gain)
            .readout(config.readout_s)
            .supports_live(config.supports_live)
            .build()
    }

    /// Number of frames completed since construction.
    pub fn frames_acquired(&self) -> u64 {
        let mut state = self.state.lock();
        self.advance(&mut state, Instant::now());
        state.next_frame_number
    }

    /// Exposure limits `(min, max)` in seconds.
    pub fn exposure_range(&self) -> (f64, f64) {
        self.exposure_range
    }

    /// Gain limits `(min, max)`.
    pub fn gain_range(&self) -> (f64, f64) {
        self.gain_range
    }

    /// Bring the simulated sensor up to date with the clock.
    fn advance(&self, state: &mut SimulatedState, now: Instant) {
        let mode = state.mode;
        match mode {
            Mode::Idle => {}
            Mode::Single {
                started,
                duration,
                settings,
            } => {
                let elapsed = now.duration_since(started);
                if elapsed >= duration {
                    let frame_number = state.next_frame_number;
                    state.next_frame_number += 1;
                    state.last_frame = self.render(frame_number, settings, elapsed - duration);
                    state.mode = Mode::Idle;
                    debug!(camera = %self.name, frame_number, "single acquisition complete");
                }
            }
            Mode::Live {
                started,
                period,
                emitted,
                settings,
            } => {
                let elapsed = now.duration_since(started).as_nanos();
                let period_ns = period.as_nanos();
                let due = u64::try_from(elapsed / period_ns).unwrap_or(u64::MAX);
                if due > emitted {
                    state.next_frame_number = state.next_frame_number.saturating_add(due - emitted);
                    let frame_number = state.next_frame_number - 1;
                    let since_completion =
                        Duration::from_nanos(u64::try_from(elapsed % period_ns).unwrap_or(u64::MAX));
                    state.last_frame = self.render(frame_number, settings, since_completion);
                    state.mode = Mode::Live {
                        started,
                        period,
                        emitted: due,
                        settings,
                    };
                }
            }
        }
    }

    /// Render the frame that completed `since_completion` ago.
    fn render(
        &self,
        frame_number: u64,
        settings: Settings,
        since_completion: Duration,
    ) -> Option<Frame<u16>> {
        let samples = test_pattern(self.size, frame_number, settings.gain);
        let lag = TimeDelta::from_std(since_completion).unwrap_or_else(|_| TimeDelta::zero());
        let metadata = FrameMetadata {
            frame_number,
            exposure_s: settings.exposure_s,
            gain: settings.gain,
            acquired_at: Utc::now() - lag,
        };
        match Frame::from_samples(self.size, samples, metadata) {
            Ok(frame) => Some(frame),
            Err(err) => {
                error!(camera = %self.name, frame_number, "failed to assemble frame: {}", err);
                None
            }
        }
    }

    fn live_period(&self, exposure_s: f64) -> CameraResult<Duration> {
        Ok(frame_duration(exposure_s, self.readout)?.max(MIN_LIVE_PERIOD))
    }

    fn state_of(mode: &Mode) -> AcquisitionState {
        match mode {
            Mode::Idle => AcquisitionState::Idle,
            Mode::Single { .. } => AcquisitionState::SingleAcquiring,
            Mode::Live { .. } => AcquisitionState::LiveAcquiring,
        }
    }
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for SimulatedCamera {
    type Pixel = u16;

    fn name(&self) -> String {
        self.name.clone()
    }

    fn size(&self) -> FrameSize {
        self.size
    }

    fn supports_live_acquisition(&self) -> bool {
        self.supports_live
    }

    fn start_live_acquisition(&self) -> CameraResult<()> {
        if !self.supports_live {
            return Err(CameraError::LiveAcquisitionUnsupported {
                camera: self.name.clone(),
            });
        }

        let now = Instant::now();
        let mut state = self.state.lock();
        self.advance(&mut state, now);
        if !matches!(state.mode, Mode::Idle) {
            return Err(CameraError::AcquisitionInProgress(Self::state_of(
                &state.mode,
            )));
        }

        let settings = state.settings;
        let period = self.live_period(settings.exposure_s)?;
        state.mode = Mode::Live {
            started: now,
            period,
            emitted: 0,
            settings,
        };
        info!(camera = %self.name, period_ms = period.as_secs_f64() * 1000.0, "live acquisition started");
        Ok(())
    }

    fn start_single_acquisition(&self) -> CameraResult<()> {
        let now = Instant::now();
        let mut state = self.state.lock();
        self.advance(&mut state, now);
        if !matches!(state.mode, Mode::Idle) {
            return Err(CameraError::AcquisitionInProgress(Self::state_of(
                &state.mode,
            )));
        }

        let settings = state.settings;
        let duration = frame_duration(settings.exposure_s, self.readout)?;
        state.mode = Mode::Single {
            started: now,
            duration,
            settings,
        };
        info!(camera = %self.name, exposure_s = settings.exposure_s, "single acquisition started");
        Ok(())
    }

    fn stop_acquisition(&self) -> CameraResult<()> {
        let mut state = self.state.lock();
        self.advance(&mut state, Instant::now());
        match state.mode {
            Mode::Idle => {
                debug!(camera = %self.name, "stop requested while idle");
            }
            Mode::Single { .. } => {
                info!(camera = %self.name, "single acquisition aborted");
            }
            Mode::Live { .. } => {
                info!(camera = %self.name, "live acquisition stopped");
            }
        }
        state.mode = Mode::Idle;
        Ok(())
    }

    fn acquired_data(&self) -> CameraResult<Frame<u16>> {
        let mut state = self.state.lock();
        self.advance(&mut state, Instant::now());
        state.last_frame.clone().ok_or(CameraError::NoFrameAvailable)
    }

    fn set_exposure(&self, seconds: f64) -> CameraResult<f64> {
        if !seconds.is_finite() {
            return Err(CameraError::InvalidParameter {
                parameter: "exposure",
                value: seconds,
                reason: "must be finite",
            });
        }
        if seconds < 0.0 {
            return Err(CameraError::InvalidParameter {
                parameter: "exposure",
                value: seconds,
                reason: "must be non-negative",
            });
        }

        let (min, max) = self.exposure_range;
        let applied = seconds.clamp(min, max);
        if applied != seconds {
            warn!(camera = %self.name, requested = seconds, applied, "exposure clamped to hardware range");
        }

        let now = Instant::now();
        let mut state = self.state.lock();
        self.advance(&mut state, now);
        if let Mode::Live { settings, .. } = state.mode {
            let period = self.live_period(applied)?;
            state.mode = Mode::Live {
                started: now,
                period,
                emitted: 0,
                settings: Settings {
                    exposure_s: applied,
                    ..settings
                },
            };
            debug!(camera = %self.name, period_ms = period.as_secs_f64() * 1000.0, "live acquisition retimed");
        }
        state.settings.exposure_s = applied;
        Ok(applied)
    }

    fn exposure(&self) -> f64 {
        self.state.lock().settings.exposure_s
    }

    fn set_gain(&self, gain: f64) -> CameraResult<f64> {
        if !gain.is_finite() {
            return Err(CameraError::InvalidParameter {
                parameter: "gain",
                value: gain,
                reason: "must be finite",
            });
        }

        let (min, max) = self.gain_range;
        let applied = gain.clamp(min, max);
        if applied != gain {
            warn!(camera = %self.name, requested = gain, applied, "gain clamped to hardware range");
        }

        let mut state = self.state.lock();
        self.advance(&mut state, Instant::now());
        if let Mode::Live { settings, .. } = &mut state.mode {
            settings.gain = applied;
        }
        state.settings.gain = applied;
        Ok(applied)
    }

    fn gain(&self) -> f64 {
        self.state.lock().settings.gain
    }

    fn is_ready(&self) -> bool {
        self.acquisition_state() == AcquisitionState::Idle
    }

    fn acquisition_state(&self) -> AcquisitionState {
        let mut state = self.state.lock();
        self.advance(&mut state, Instant::now());
        Self::state_of(&state.mode)
    }
}

/// Time to acquire one frame: exposure plus sensor readout.
///
/// # Errors
/// `InvalidParameter` if the total does not fit in a [`Duration`].
pub(crate) fn frame_duration(exposure_s: f64, readout: Duration) -> CameraResult<Duration> {
    Duration::try_from_secs_f64(exposure_s)
        .ok()
        .and_then(|exposure| exposure.checked_add(readout))
        .ok_or(CameraError::InvalidParameter {
            parameter: "exposure",
            value: exposure_s,
            reason: "acquisition time is not representable",
        })
}

/// Convert a readout time in seconds.
///
/// # Errors
/// `InvalidParameter` for negative, non-finite or unrepresentable values.
pub(crate) fn readout_duration(readout_s: f64) -> CameraResult<Duration> {
    Duration::try_from_secs_f64(readout_s).map_err(|_| CameraError::InvalidParameter {
        parameter: "readout",
        value: readout_s,
        reason: "must be finite, non-negative and representable",
    })
}

/// Builder for [`SimulatedCamera`].
#[derive(Debug, Clone)]
pub struct SimulatedCameraBuilder {
    name: String,
    width: u32,
    height: u32,
    exposure_s: f64,
    gain: f64,
    exposure_range: (f64, f64),
    gain_range: (f64, f64),
    readout_s: f64,
    supports_live: bool,
}

impl Default for SimulatedCameraBuilder {
    fn default() -> Self {
        let defaults = SimulatedCameraConfig::default();
        Self {
            name: defaults.name,
            width: defaults.width,
            height: defaults.height,
            exposure_s: defaults.exposure_s,
            gain: defaults.gain,
            exposure_range: (defaults.min_exposure_s, defaults.max_exposure_s),
            gain_range: (defaults.min_gain, defaults.max_gain),
            readout_s: defaults.readout_s,
            supports_live: defaults.supports_live,
        }
    }
}

impl SimulatedCameraBuilder {
    /// Identifier reported by [`Camera::name`].
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sensor dimensions in pixels.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Initial exposure in seconds.
    pub fn exposure(mut self, seconds: f64) -> Self {
        self.exposure_s = seconds;
        self
    }

    /// Initial gain.
    pub fn gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    /// Exposure limits in seconds; requests outside are clamped.
    pub fn exposure_range(mut self, min_s: f64, max_s: f64) -> Self {
        self.exposure_range = (min_s, max_s);
        self
    }

    /// Gain limits; requests outside are clamped.
    pub fn gain_range(mut self, min: f64, max: f64) -> Self {
        self.gain_range = (min, max);
        self
    }

    /// Sensor readout time added to every exposure, in seconds.
    pub fn readout(mut self, seconds: f64) -> Self {
        self.readout_s = seconds;
        self
    }

    /// Whether the camera accepts live acquisition.
    pub fn supports_live(mut self, supports_live: bool) -> Self {
        self.supports_live = supports_live;
        self
    }

    /// Validate settings and build the camera.
    ///
    /// # Errors
    /// - `InvalidFrameSize` for zero or oversized dimensions
    /// - `InvalidParameter` for non-finite or unordered ranges, negative
    ///   exposure or readout, initial values outside their range, or an
    ///   acquisition time too long to represent
    pub fn build(self) -> CameraResult<SimulatedCamera> {
        let size = FrameSize::new(self.width, self.height)?;
        validate_payload::<u16>(size)?;
        check_range("exposure", self.exposure_range)?;
        check_range("gain", self.gain_range)?;

        if self.exposure_range.0 < 0.0 {
            return Err(CameraError::InvalidParameter {
                parameter: "exposure",
                value: self.exposure_range.0,
                reason: "minimum must be non-negative",
            });
        }
        let readout = readout_duration(self.readout_s)?;
        frame_duration(self.exposure_range.1, readout)?;
        check_within("exposure", self.exposure_s, self.exposure_range)?;
        check_within("gain", self.gain, self.gain_range)?;

        Ok(self.assemble(size, readout))
    }

    fn assemble(self, size: FrameSize, readout: Duration) -> SimulatedCamera {
        SimulatedCamera {
            name: self.name,
            size,
            exposure_range: self.exposure_range,
            gain_range: self.gain_range,
            readout,
            supports_live: self.supports_live,
            state: Mutex::new(SimulatedState {
                settings: Settings {
                    exposure_s: self.exposure_s,
                    gain: self.gain,
                },
                mode: Mode::Idle,
                last_frame: None,
                next_frame_number: 0,
            }),
        }
    }
}

const DEFAULT_SIZE: FrameSize = FrameSize::new_unchecked(512, 512);

fn check_range(parameter: &'static str, (min, max): (f64, f64)) -> CameraResult<()> {
    if !min.is_finite() || !max.is_finite() {
        return Err(CameraError::InvalidParameter {
            parameter,
            value: if min.is_finite() { max } else { min },
            reason: "range bounds must be finite",
        });
    }
    if min > max {
        return Err(CameraError::InvalidParameter {
            parameter,
            value: min,
            reason: "range minimum exceeds maximum",
        });
    }
    Ok(())
}

fn check_within(parameter: &'static str, value: f64, (min, max): (f64, f64)) -> CameraResult<()> {
    if !(min..=max).contains(&value) {
        return Err(CameraError::InvalidParameter {
            parameter,
            value,
            reason: "initial value outside range",
        });
    }
    Ok(())
}

/// Diagonal gradient `((x + y + frame) % 256) * 256`, scaled by gain.
fn test_pattern(size: FrameSize, frame_number: u64, gain: f64) -> Vec<u16> {
    let width = u64::from(size.width());
    let height = u64::from(size.height());
    let mut samples = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let base = ((x + y + frame_number) % 256) * 256;
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let value = (base as f64 * gain).clamp(0.0, f64::from(u16::MAX)) as u16;
            samples.push(value);
        }
    }
    samples
}
