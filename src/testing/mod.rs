//! Conformance checks for camera drivers.
//!
//! Any type implementing [`Camera`] can be run through [`check_conformance`],
//! which exercises the contract and records one [`CheckResult`] per property:
//!
//! - `size_positive`: width and height are strictly positive
//! - `name_stable`: the name is non-empty and does not change between calls
//! - `exposure_round_trip`: `exposure()` reports what `set_exposure` applied
//! - `gain_round_trip`: `gain()` reports what `set_gain` applied
//! - `invalid_exposure_rejected`: negative and NaN exposures are refused
//! - `stop_when_idle`: stopping an idle driver succeeds
//! - `live_support_consistent`: live acquisition starts exactly when advertised
//!
//! Checks that need an idle driver are skipped if it is busy. Exposure and
//! gain are restored to their original values afterwards.

use serde::Serialize;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::camera::Camera;

/// Tolerance used when comparing applied and reported floating-point settings.
const SETTING_TOLERANCE: f64 = 1e-9;

/// Outcome of a single conformance check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    /// Driver behaved as the contract requires
    Passed,
    /// Driver violated the contract
    Failed,
    /// Check could not run in the driver's current state
    Skipped,
}

impl CheckStatus {
    /// Get human-readable status string
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Passed => "PASSED",
            CheckStatus::Failed => "FAILED",
            CheckStatus::Skipped => "SKIPPED",
        }
    }
}

/// Result of one conformance check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Check identifier, e.g. `exposure_round_trip`
    pub name: &'static str,
    /// Outcome
    pub status: CheckStatus,
    /// Explanation for failed or skipped checks
    pub detail: Option<String>,
}

impl CheckResult {
    fn passed(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Passed,
            detail: None,
        }
    }

    fn failed(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: CheckStatus::Failed,
            detail: Some(detail.into()),
        }
    }

    fn skipped(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            detail: Some(detail.into()),
        }
    }
}

/// Complete conformance run for one driver
#[derive(Debug, Clone, Serialize)]
pub struct ConformanceReport {
    /// Name the driver reported
    pub camera: String,
    /// When the run began
    pub started_at: DateTime<Utc>,
    /// Total run time
    pub duration: Duration,
    /// Results in execution order
    pub checks: Vec<CheckResult>,
}

impl ConformanceReport {
    /// True when no check failed. Skipped checks do not count as failures.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.status != CheckStatus::Failed)
    }

    /// All failed checks.
    pub fn failures(&self) -> Vec<&CheckResult> {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Failed)
            .collect()
    }

    /// Look up a check by name.
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Render as a markdown table.
    pub fn to_markdown(&self) -> String {
        let mut out = format!("# Conformance: {}\n\n", self.camera);
        out.push_str("| Check | Status | Detail |\n|---|---|---|\n");
        for check in &self.checks {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                check.name,
                check.status.as_str(),
                check.detail.as_deref().unwrap_or("")
            ));
        }
        out
    }
}

/// Run every conformance check against `camera`.
pub fn check_conformance<C: Camera + ?Sized>(camera: &C) -> ConformanceReport {
    let started_at = Utc::now();
    let start = Instant::now();
    let name = camera.name();

    let checks = vec![
        check_size(camera),
        check_name(camera, &name),
        check_exposure_round_trip(camera),
        check_gain_round_trip(camera),
        check_invalid_exposure(camera),
        check_stop_when_idle(camera),
        check_live_support(camera),
    ];

    for check in &checks {
        match check.status {
            CheckStatus::Failed => warn!(
                camera = %name,
                check = check.name,
                detail = check.detail.as_deref().unwrap_or(""),
                "conformance check failed"
            ),
            _ => debug!(camera = %name, check = check.name, status = check.status.as_str()),
        }
    }

    ConformanceReport {
        camera: name,
        started_at,
        duration: start.elapsed(),
        checks,
    }
}

fn check_size<C: Camera + ?Sized>(camera: &C) -> CheckResult {
    const NAME: &str = "size_positive";
    let (width, height) = camera.size().as_tuple();
    if width > 0 && height > 0 {
        CheckResult::passed(NAME)
    } else {
        CheckResult::failed(NAME, format!("size {}x{} is not positive", width, height))
    }
}

fn check_name<C: Camera + ?Sized>(camera: &C, first: &str) -> CheckResult {
    const NAME: &str = "name_stable";
    if first.trim().is_empty() {
        return CheckResult::failed(NAME, "name is empty");
    }
    let second = camera.name();
    if second != first {
        return CheckResult::failed(NAME, format!("name changed from '{}' to '{}'", first, second));
    }
    CheckResult::passed(NAME)
}

fn check_exposure_round_trip<C: Camera + ?Sized>(camera: &C) -> CheckResult {
    const NAME: &str = "exposure_round_trip";
    let original = camera.exposure();
    let requested = if original > 0.0 { original / 2.0 } else { 0.01 };

    let result = match camera.set_exposure(requested) {
        Ok(applied) => {
            let reported = camera.exposure();
            if (reported - applied).abs() <= SETTING_TOLERANCE {
                CheckResult::passed(NAME)
            } else {
                CheckResult::failed(
                    NAME,
                    format!("set_exposure applied {} but exposure() reports {}", applied, reported),
                )
            }
        }
        Err(err) => CheckResult::failed(NAME, format!("set_exposure({}) failed: {}", requested, err)),
    };

    if let Err(err) = camera.set_exposure(original) {
        warn!("failed to restore exposure {}: {}", original, err);
    }
    result
}

fn check_gain_round_trip<C: Camera + ?Sized>(camera: &C) -> CheckResult {
    const NAME: &str = "gain_round_trip";
    let original = camera.gain();
    let requested = if original > 0.0 { original * 2.0 } else { 1.0 };

    let result = match camera.set_gain(requested) {
        Ok(applied) => {
            let reported = camera.gain();
            if (reported - applied).abs() <= SETTING_TOLERANCE {
                CheckResult::passed(NAME)
            } else {
                CheckResult::failed(
                    NAME,
                    format!("set_gain applied {} but gain() reports {}", applied, reported),
                )
            }
        }
        Err(err) => CheckResult::failed(NAME, format!("set_gain({}) failed: {}", requested, err)),
    };

    if let Err(err) = camera.set_gain(original) {
        warn!("failed to restore gain {}: {}", original, err);
    }
    result
}

fn check_invalid_exposure<C: Camera + ?Sized>(camera: &C) -> CheckResult {
    const NAME: &str = "invalid_exposure_rejected";
    let original = camera.exposure();
    let mut accepted = Vec::new();
    for value in [-1.0, f64::NAN] {
        if camera.set_exposure(value).is_ok() {
            accepted.push(value.to_string());
        }
    }
    if let Err(err) = camera.set_exposure(original) {
        warn!("failed to restore exposure {}: {}", original, err);
    }

    if accepted.is_empty() {
        CheckResult::passed(NAME)
    } else {
        CheckResult::failed(NAME, format!("accepted exposure {}", accepted.join(", ")))
    }
}

fn check_stop_when_idle<C: Camera + ?Sized>(camera: &C) -> CheckResult {
    const NAME: &str = "stop_when_idle";
    if camera.is_acquiring() {
        return CheckResult::skipped(NAME, "camera is acquiring");
    }
    match camera.stop_acquisition() {
        Ok(()) => CheckResult::passed(NAME),
        Err(err) => CheckResult::failed(NAME, format!("stop_acquisition failed: {}", err)),
    }
}

fn check_live_support<C: Camera + ?Sized>(camera: &C) -> CheckResult {
    const NAME: &str = "live_support_consistent";
    if !camera.is_ready() {
        return CheckResult::skipped(NAME, "camera is not ready");
    }

    let supported = camera.supports_live_acquisition();
    match (supported, camera.start_live_acquisition()) {
        (false, Err(_)) => CheckResult::passed(NAME),
        (false, Ok(())) => {
            if let Err(err) = camera.stop_acquisition() {
                warn!("failed to stop unadvertised live acquisition: {}", err);
            }
            CheckResult::failed(
                NAME,
                "live acquisition started although it is not advertised",
            )
        }
        (true, Ok(())) => match camera.stop_acquisition() {
            Ok(()) => CheckResult::passed(NAME),
            Err(err) => CheckResult::failed(NAME, format!("could not stop live acquisition: {}", err)),
        },
        (true, Err(err)) => CheckResult::failed(
            NAME,
            format!("live acquisition advertised but failed to start: {}", err),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::AcquisitionState;
    use crate::error::{CameraError, CameraResult};
    use crate::frame::{Frame, FrameMetadata, FrameSize};
    use crate::simulated::SimulatedCamera;
    use tracing_test::traced_test;

    /// Streams without advertising it and cannot be stopped.
    struct StuckCamera;

    impl Camera for StuckCamera {
        type Pixel = u8;

        fn name(&self) -> String {
            "Stuck".to_string()
        }

        fn size(&self) -> FrameSize {
            FrameSize::new(1, 1).unwrap()
        }

        fn supports_live_acquisition(&self) -> bool {
            false
        }

        fn start_live_acquisition(&self) -> CameraResult<()> {
            Ok(())
        }

        fn start_single_acquisition(&self) -> CameraResult<()> {
            Ok(())
        }

        fn stop_acquisition(&self) -> CameraResult<()> {
            Err(CameraError::Hardware("shutter jammed".to_string()))
        }

        fn acquired_data(&self) -> CameraResult<Frame<u8>> {
            Frame::from_samples(self.size(), vec![0], FrameMetadata::default())
        }

        fn set_exposure(&self, seconds: f64) -> CameraResult<f64> {
            Ok(seconds)
        }

        fn exposure(&self) -> f64 {
            0.0
        }

        fn set_gain(&self, gain: f64) -> CameraResult<f64> {
            Ok(gain)
        }

        fn gain(&self) -> f64 {
            1.0
        }

        fn is_ready(&self) -> bool {
            true
        }

        fn acquisition_state(&self) -> AcquisitionState {
            AcquisitionState::Idle
        }
    }

    #[test]
    fn test_simulated_camera_conforms() {
        let camera = SimulatedCamera::new();
        let report = check_conformance(&camera);

        assert!(report.passed(), "failures: {:?}", report.failures());
        assert_eq!(report.checks.len(), 7);
        assert_eq!(report.camera, "Simulated Camera SIM-0001");
    }

    #[test]
    fn test_settings_restored() {
        let camera = SimulatedCamera::new();
        camera.set_exposure(0.3).unwrap();
        camera.set_gain(2.5).unwrap();

        check_conformance(&camera);

        assert_eq!(camera.exposure(), 0.3);
        assert_eq!(camera.gain(), 2.5);
    }

    #[test]
    fn test_busy_camera_skips_stateful_checks() {
        let camera = SimulatedCamera::builder()
            .exposure(60.0)
            .build()
            .unwrap();
        camera.start_single_acquisition().unwrap();

        let report = check_conformance(&camera);
        assert_eq!(
            report.check("stop_when_idle").map(|c| c.status),
            Some(CheckStatus::Skipped)
        );
        assert_eq!(
            report.check("live_support_consistent").map(|c| c.status),
            Some(CheckStatus::Skipped)
        );
        assert!(report.passed());
    }

    #[test]
    fn test_markdown_lists_every_check() {
        let report = check_conformance(&SimulatedCamera::new());
        let markdown = report.to_markdown();
        assert!(markdown.starts_with("# Conformance: Simulated Camera SIM-0001"));
        for check in &report.checks {
            assert!(markdown.contains(check.name));
        }
    }

    #[test]
    #[traced_test]
    fn test_failed_stop_after_unadvertised_live_is_logged() {
        let report = check_conformance(&StuckCamera);
        assert_eq!(
            report.check("live_support_consistent").map(|c| c.status),
            Some(CheckStatus::Failed)
        );
        assert!(logs_contain("failed to stop unadvertised live acquisition"));
        assert!(logs_contain("shutter jammed"));
    }
}
