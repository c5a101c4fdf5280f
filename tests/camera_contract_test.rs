//! Integration tests for the camera contract: the simulated driver used through
//! trait objects, and conformance checks catching a misbehaving driver.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use daq_camera::testing::{check_conformance, CheckStatus};
use daq_camera::{
    AcquisitionState, Camera, CameraError, CameraResult, Frame, FrameMetadata, FrameSize,
    SimulatedCamera,
};
use parking_lot::Mutex;

#[test]
fn test_default_stub_scenario() {
    // 512x512, exposure 0.1 s, gain 1.0
    let camera = SimulatedCamera::new();
    assert_eq!(camera.size().as_tuple(), (512, 512));
    assert_eq!(camera.exposure(), 0.1);
    assert_eq!(camera.gain(), 1.0);

    camera.start_single_acquisition().unwrap();
    assert!(!camera.is_ready());

    thread::sleep(Duration::from_millis(200));
    assert!(camera.is_ready());

    let frame = camera.acquired_data().unwrap();
    assert_eq!(frame.rows().count(), 512);
    assert!(frame.rows().all(|row| row.len() == 512));
}

#[test]
fn test_shared_trait_object_across_threads() {
    let camera: Arc<dyn Camera<Pixel = u16>> = Arc::new(
        SimulatedCamera::builder()
            .size(16, 16)
            .exposure(0.0)
            .build()
            .unwrap(),
    );

    let controller = {
        let camera = Arc::clone(&camera);
        thread::spawn(move || {
            camera.start_live_acquisition().unwrap();
            thread::sleep(Duration::from_millis(20));
            camera.stop_acquisition().unwrap();
        })
    };

    // A UI thread polling while the controller streams
    let mut observed_live = false;
    for _ in 0..200 {
        if camera.acquisition_state() == AcquisitionState::LiveAcquiring {
            observed_live = true;
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }

    controller.join().unwrap();
    assert!(observed_live);
    assert!(camera.is_ready());
    assert!(camera.acquired_data().is_ok());
}

#[test]
fn test_to_f32_on_acquired_frame() {
    let camera = SimulatedCamera::builder()
        .size(4, 4)
        .exposure(0.0)
        .build()
        .unwrap();
    camera.start_single_acquisition().unwrap();

    let frame = camera.acquired_data().unwrap();
    let wide = frame.to_f32();
    for (raw, converted) in frame.samples().iter().zip(wide.samples()) {
        assert_eq!(f32::from(*raw), *converted);
    }
}

/// Driver that claims no live support yet streams anyway, and silently
/// rounds exposure without reporting it.
struct SloppyCamera {
    exposure: Mutex<f64>,
    live: Mutex<bool>,
}

impl Camera for SloppyCamera {
    type Pixel = u8;

    fn name(&self) -> String {
        "Sloppy".to_string()
    }

    fn size(&self) -> FrameSize {
        FrameSize::new(2, 2).unwrap()
    }

    fn supports_live_acquisition(&self) -> bool {
        false
    }

    fn start_live_acquisition(&self) -> CameraResult<()> {
        *self.live.lock() = true;
        Ok(())
    }

    fn start_single_acquisition(&self) -> CameraResult<()> {
        Ok(())
    }

    fn stop_acquisition(&self) -> CameraResult<()> {
        *self.live.lock() = false;
        Ok(())
    }

    fn acquired_data(&self) -> CameraResult<Frame<u8>> {
        Frame::from_samples(self.size(), vec![0; 4], FrameMetadata::default())
    }

    fn set_exposure(&self, seconds: f64) -> CameraResult<f64> {
        if seconds.is_nan() || seconds < 0.0 {
            return Err(CameraError::InvalidParameter {
                parameter: "exposure",
                value: seconds,
                reason: "must be non-negative",
            });
        }
        *self.exposure.lock() = (seconds * 10.0).round() / 10.0;
        Ok(seconds)
    }

    fn exposure(&self) -> f64 {
        *self.exposure.lock()
    }

    fn set_gain(&self, gain: f64) -> CameraResult<f64> {
        Ok(gain)
    }

    fn gain(&self) -> f64 {
        1.0
    }

    fn is_ready(&self) -> bool {
        !*self.live.lock()
    }

    fn acquisition_state(&self) -> AcquisitionState {
        if *self.live.lock() {
            AcquisitionState::LiveAcquiring
        } else {
            AcquisitionState::Idle
        }
    }
}

#[test]
fn test_conformance_flags_sloppy_driver() {
    let camera = SloppyCamera {
        exposure: Mutex::new(0.1),
        live: Mutex::new(false),
    };

    let report = check_conformance(&camera);
    assert!(!report.passed());

    let failed: Vec<&str> = report.failures().iter().map(|c| c.name).collect();
    assert!(failed.contains(&"exposure_round_trip"));
    assert!(failed.contains(&"gain_round_trip"));
    assert!(failed.contains(&"live_support_consistent"));

    assert_eq!(
        report.check("size_positive").map(|c| c.status),
        Some(CheckStatus::Passed)
    );
    assert_eq!(
        report.check("invalid_exposure_rejected").map(|c| c.status),
        Some(CheckStatus::Passed)
    );
    // The failed live check must not leave the driver streaming
    assert!(camera.is_ready());
}

#[test]
fn test_conformance_through_trait_object() {
    let camera: Box<dyn Camera<Pixel = u16>> = Box::new(SimulatedCamera::new());
    let report = check_conformance(camera.as_ref());
    assert!(report.passed(), "failures: {:?}", report.failures());
}
