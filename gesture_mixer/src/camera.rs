//! Frame sources: a real webcam (feature `camera`) or paced blank frames.
//!
//! Frames are stored as `0x00RRGGBB` words so the overlay can blit them
//! straight into its `minifb` buffer.

use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("cannot open camera: {0}")]
    Open(String),

    #[error("frame capture failed: {0}")]
    Capture(String),

    #[error("frame decode failed: {0}")]
    Decode(String),
}

// ════════════════════════════════════════════════════════════════════════════
// Frame
// ════════════════════════════════════════════════════════════════════════════

/// One captured image.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width:     usize,
    pub height:    usize,
    pub pixels:    Vec<u32>,
    /// Time since the source was opened.
    pub timestamp: Duration,
}

impl Frame {
    pub fn blank(width: usize, height: usize, timestamp: Duration) -> Self {
        Frame { width, height, pixels: vec![0; width * height], timestamp }
    }

    /// Pack tightly interleaved RGBA bytes, optionally mirrored left/right.
    pub fn from_rgba(rgba: &[u8], width: usize, height: usize, mirror: bool, timestamp: Duration) -> Result<Self, CameraError> {
        if rgba.len() != width * height * 4 {
            return Err(CameraError::Decode(format!(
                "expected {} bytes for {}x{} RGBA, got {}",
                width * height * 4,
                width,
                height,
                rgba.len()
            )));
        }
        let mut pixels: Vec<u32> = rgba
            .chunks_exact(4)
            .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
            .collect();
        if mirror {
            for row in pixels.chunks_exact_mut(width.max(1)) {
                row.reverse();
            }
        }
        Ok(Frame { width, height, pixels, timestamp })
    }

    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x]
        } else {
            0
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FrameSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can hand the main loop one frame at a time.
///
/// `read_frame` blocks until a frame is available and so paces the loop.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<Frame, CameraError>;

    fn describe(&self) -> String;
}

// ════════════════════════════════════════════════════════════════════════════
// PacedBlankSource — no camera needed
// ════════════════════════════════════════════════════════════════════════════

/// Black frames at a fixed rate.
pub struct PacedBlankSource {
    width:    usize,
    height:   usize,
    interval: Duration,
    started:  Instant,
    next_due: Instant,
}

impl PacedBlankSource {
    pub fn new(width: usize, height: usize, fps: u32) -> Self {
        let now = Instant::now();
        PacedBlankSource {
            width,
            height,
            interval: Duration::from_secs(1) / fps.max(1),
            started:  now,
            next_due: now,
        }
    }
}

impl FrameSource for PacedBlankSource {
    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        let now = Instant::now();
        if self.next_due > now {
            thread::sleep(self.next_due - now);
        }
        // Don't try to catch up after a stall
        self.next_due = (self.next_due + self.interval).max(Instant::now());
        Ok(Frame::blank(self.width, self.height, self.started.elapsed()))
    }

    fn describe(&self) -> String {
        format!("blank frames {}x{}", self.width, self.height)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// NokhwaCamera — real webcam (feature = "camera")
// ════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "camera")]
pub use self::webcam::NokhwaCamera;

#[cfg(feature = "camera")]
mod webcam {
    use std::time::Instant;

    use nokhwa::pixel_format::RgbAFormat;
    use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
    use nokhwa::Camera;

    use super::{CameraError, Frame, FrameSource};
    use crate::config::CameraConfig;

    /// Webcam opened by index, decoded to RGBA.
    pub struct NokhwaCamera {
        camera:  Camera,
        mirror:  bool,
        started: Instant,
        name:    String,
    }

    impl NokhwaCamera {
        pub fn open(config: &CameraConfig) -> Result<Self, CameraError> {
            let index = CameraIndex::Index(config.index);
            let preferred = Resolution::new(config.width, config.height);

            let requested = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::HighestResolution(preferred));
            let mut camera = match Camera::new(index.clone(), requested) {
                Ok(c) => c,
                Err(e) => {
                    log::warn!("Camera {} rejected {}x{}: {:?}", config.index, config.width, config.height, e);
                    let fallback = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::None);
                    Camera::new(index, fallback).map_err(|e| CameraError::Open(format!("{:?}", e)))?
                }
            };

            camera.open_stream().map_err(|e| CameraError::Open(format!("{:?}", e)))?;

            let name = camera.info().human_name();
            log::info!(
                "Camera opened: {} ({}x{})",
                name,
                camera.resolution().width(),
                camera.resolution().height()
            );

            Ok(NokhwaCamera { camera, mirror: config.mirror, started: Instant::now(), name })
        }
    }

    impl FrameSource for NokhwaCamera {
        fn read_frame(&mut self) -> Result<Frame, CameraError> {
            let buffer = self.camera.frame().map_err(|e| CameraError::Capture(format!("{:?}", e)))?;
            let timestamp = self.started.elapsed();
            let image = buffer
                .decode_image::<RgbAFormat>()
                .map_err(|e| CameraError::Decode(format!("{:?}", e)))?;
            let width = buffer.resolution().width() as usize;
            let height = buffer.resolution().height() as usize;
            Frame::from_rgba(&image.into_raw(), width, height, self.mirror, timestamp)
        }

        fn describe(&self) -> String {
            self.name.clone()
        }
    }

    impl Drop for NokhwaCamera {
        fn drop(&mut self) {
            if let Err(e) = self.camera.stop_stream() {
                log::debug!("stopping camera stream: {:?}", e);
            }
            log::info!("Camera released");
        }
    }
}
