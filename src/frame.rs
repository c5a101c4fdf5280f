//! Frame types that cross the camera contract boundary.
//!
//! A [`Frame`] is a row-major 2-D grid of samples together with the acquisition
//! metadata the driver recorded for it. The element type is generic over
//! [`Sample`] because bit depth depends on the hardware: a 12-bit sensor fits
//! `u16`, a processed image may be `f32`.

use std::fmt;
use std::mem;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{CameraError, CameraResult};

/// Maximum allowed frame payload in bytes (default: 100MB).
pub const MAX_FRAME_BYTES: usize = 100 * 1024 * 1024;
/// Maximum supported width/height for frames.
pub const MAX_FRAME_DIMENSION: u32 = 65_536;

/// Numeric pixel element produced by a camera.
pub trait Sample: Copy + Send + Sync + fmt::Debug + PartialOrd + 'static {
    /// Significant bits carried by one sample.
    const BITS: u32;

    /// Widen to `f64` for statistics and conversions.
    fn to_f64(self) -> f64;
}

macro_rules! impl_sample {
    ($($ty:ty => $bits:expr),* $(,)?) => {
        $(
            impl Sample for $ty {
                const BITS: u32 = $bits;

                fn to_f64(self) -> f64 {
                    f64::from(self)
                }
            }
        )*
    };
}

impl_sample!(u8 => 8, u16 => 16, u32 => 32, f32 => 32, f64 => 64);

/// Sensor or frame dimensions in pixels. Both sides are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FrameSize {
    width: u32,
    height: u32,
}

impl FrameSize {
    /// Validate and build a frame size.
    pub fn new(width: u32, height: u32) -> CameraResult<Self> {
        if width == 0 || height == 0 {
            return Err(CameraError::InvalidFrameSize {
                width,
                height,
                reason: "dimensions must be positive",
            });
        }
        if width > MAX_FRAME_DIMENSION || height > MAX_FRAME_DIMENSION {
            return Err(CameraError::InvalidFrameSize {
                width,
                height,
                reason: "dimension exceeds 65536",
            });
        }
        Ok(Self { width, height })
    }

    /// Build without validation; caller guarantees `1..=MAX_FRAME_DIMENSION`.
    pub(crate) const fn new_unchecked(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)` tuple.
    pub fn as_tuple(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels, or `None` if it does not fit in `usize`.
    pub fn pixel_count(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Check that a frame of `size` with `P` samples fits [`MAX_FRAME_BYTES`].
///
/// Returns the pixel count.
pub fn validate_payload<P: Sample>(size: FrameSize) -> CameraResult<usize> {
    let pixels = size.pixel_count().ok_or(CameraError::InvalidFrameSize {
        width: size.width(),
        height: size.height(),
        reason: "pixel count overflows",
    })?;

    let too_large = pixels
        .checked_mul(mem::size_of::<P>())
        .map_or(true, |bytes| bytes > MAX_FRAME_BYTES);
    if too_large {
        return Err(CameraError::InvalidFrameSize {
            width: size.width(),
            height: size.height(),
            reason: "payload exceeds 100MB",
        });
    }

    Ok(pixels)
}

/// Acquisition metadata recorded by the driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameMetadata {
    /// Monotonic counter across all acquisitions of one driver instance
    pub frame_number: u64,
    /// Exposure the frame was acquired with, in seconds
    pub exposure_s: f64,
    /// Gain the frame was acquired with
    pub gain: f64,
    /// Wall-clock time the frame completed, not the time it was read
    pub acquired_at: DateTime<Utc>,
}

impl Default for FrameMetadata {
    fn default() -> Self {
        Self {
            frame_number: 0,
            exposure_s: 0.0,
            gain: 1.0,
            acquired_at: Utc::now(),
        }
    }
}

/// Summary statistics over every sample of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameStats {
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
    /// Arithmetic mean of all samples
    pub mean: f64,
}

/// A completed acquisition: row-major samples plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<P> {
    size: FrameSize,
    samples: Vec<P>,
    /// Driver-recorded acquisition metadata
    pub metadata: FrameMetadata,
}

impl<P: Sample> Frame<P> {
    /// Build a frame from row-major samples.
    ///
    /// # Errors
    /// - `SampleCountMismatch` if `samples.len() != width * height`
    /// - `InvalidFrameSize` if the payload exceeds [`MAX_FRAME_BYTES`]
    pub fn from_samples(
        size: FrameSize,
        samples: Vec<P>,
        metadata: FrameMetadata,
    ) -> CameraResult<Self> {
        let expected = validate_payload::<P>(size)?;
        if samples.len() != expected {
            return Err(CameraError::SampleCountMismatch {
                expected,
                actual: samples.len(),
            });
        }

        Ok(Self {
            size,
            samples,
            metadata,
        })
    }

    /// Frame dimensions.
    pub fn size(&self) -> FrameSize {
        self.size
    }

    /// All samples in row-major order.
    pub fn samples(&self) -> &[P] {
        &self.samples
    }

    /// Consume the frame and return its samples.
    pub fn into_samples(self) -> Vec<P> {
        self.samples
    }

    /// Iterate over rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[P]> + '_ {
        self.samples.chunks_exact(self.size.width() as usize)
    }

    /// Row `y`, if in bounds.
    pub fn row(&self, y: u32) -> Option<&[P]> {
        self.rows().nth(y as usize)
    }

    /// Sample at column `x`, row `y`, if in bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<P> {
        if x >= self.size.width() || y >= self.size.height() {
            return None;
        }
        let index = y as usize * self.size.width() as usize + x as usize;
        self.samples.get(index).copied()
    }

    /// Owned `[[row], [row], ...]` view.
    pub fn to_rows(&self) -> Vec<Vec<P>> {
        self.rows().map(<[P]>::to_vec).collect()
    }

    /// Convert every sample, keeping size and metadata.
    pub fn map_samples<Q: Sample>(&self, f: impl Fn(P) -> Q) -> Frame<Q> {
        Frame {
            size: self.size,
            samples: self.samples.iter().copied().map(f).collect(),
            metadata: self.metadata.clone(),
        }
    }

    /// Convert to the canonical `f32` representation.
    ///
    /// Exact for 8 and 16 bit integer samples. `u32` samples above 2^24 and
    /// `f64` samples are rounded to the nearest representable `f32`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_f32(&self) -> Frame<f32> {
        self.map_samples(|s| s.to_f64() as f32)
    }

    /// Minimum, maximum and mean sample value.
    pub fn stats(&self) -> FrameStats {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for value in self.samples.iter().map(|s| s.to_f64()) {
            min = min.min(value);
            max = max.max(value);
            sum += value;
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = sum / self.samples.len() as f64;
        FrameStats { min, max, mean }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_2x3() -> Frame<u16> {
        let size = FrameSize::new(2, 3).unwrap();
        Frame::from_samples(size, vec![1, 2, 3, 4, 5, 6], FrameMetadata::default()).unwrap()
    }

    #[test]
    fn test_frame_size_rejects_zero() {
        assert!(matches!(
            FrameSize::new(0, 480),
            Err(CameraError::InvalidFrameSize { .. })
        ));
        assert!(FrameSize::new(640, 0).is_err());
    }

    #[test]
    fn test_frame_size_rejects_oversized_dimension() {
        assert!(FrameSize::new(MAX_FRAME_DIMENSION + 1, 1).is_err());
        assert!(FrameSize::new(MAX_FRAME_DIMENSION, 1).is_ok());
    }

    #[test]
    fn test_frame_size_display() {
        let size = FrameSize::new(512, 256).unwrap();
        assert_eq!(size.to_string(), "512x256");
        assert_eq!(size.as_tuple(), (512, 256));
    }

    #[test]
    fn test_sample_count_mismatch() {
        let size = FrameSize::new(4, 4).unwrap();
        let result = Frame::from_samples(size, vec![0u8; 15], FrameMetadata::default());
        assert_eq!(
            result.unwrap_err(),
            CameraError::SampleCountMismatch {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn test_payload_limit() {
        // 65536 * 65536 u8 samples is 4 GiB, well past the limit
        let size = FrameSize::new(MAX_FRAME_DIMENSION, MAX_FRAME_DIMENSION).unwrap();
        let result = Frame::<u8>::from_samples(size, Vec::new(), FrameMetadata::default());
        assert!(matches!(result, Err(CameraError::InvalidFrameSize { .. })));
    }

    #[test]
    fn test_rows_are_row_major() {
        let frame = frame_2x3();
        assert_eq!(frame.to_rows(), vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
        assert_eq!(frame.row(1), Some(&[3u16, 4][..]));
        assert_eq!(frame.row(3), None);
    }

    #[test]
    fn test_pixel_lookup() {
        let frame = frame_2x3();
        assert_eq!(frame.pixel(0, 0), Some(1));
        assert_eq!(frame.pixel(1, 2), Some(6));
        assert_eq!(frame.pixel(2, 0), None);
        assert_eq!(frame.pixel(0, 3), None);
    }

    #[test]
    fn test_stats() {
        let stats = frame_2x3().stats();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 6.0);
        assert!((stats.mean - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_to_f32_keeps_metadata() {
        let mut frame = frame_2x3();
        frame.metadata.frame_number = 42;
        let converted = frame.to_f32();
        assert_eq!(converted.samples(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(converted.metadata.frame_number, 42);
        assert_eq!(converted.size(), frame.size());
    }

    #[test]
    fn test_sample_bits() {
        assert_eq!(<u8 as Sample>::BITS, 8);
        assert_eq!(<u16 as Sample>::BITS, 16);
        assert_eq!(<f64 as Sample>::BITS, 64);
    }
}
