//! Capture Unit: sample the live video source once and encode it as JPEG.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use sortcam_types::CaptureArtifact;
use thiserror::Error;

/// Lossy encode quality (0.9 on a 0..1 scale).
pub const JPEG_QUALITY: u8 = 90;

const RGBA_CHANNELS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Expected RGBA buffer length, or `None` on overflow.
    #[must_use]
    pub fn rgba_len(self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(RGBA_CHANNELS)
    }
}

/// One RGBA frame as reported by the video source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// Reported dimensions. Zero means the source has not reported them yet.
    pub size: FrameSize,
    pub rgba: Vec<u8>,
}

impl VideoFrame {
    #[must_use]
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        Self {
            size: FrameSize::new(width, height),
            rgba,
        }
    }
}

/// Read-only access to the current frame of a live video source.
pub trait VideoSource: Send + Sync {
    /// The frame on screen right now, or `None` if the source is not running.
    fn current_frame(&self) -> Option<VideoFrame>;
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no active video frame")]
    NoActiveFrame,
    #[error("frame buffer of {len} bytes does not match {width}x{height}")]
    FrameSizeMismatch { width: u32, height: u32, len: usize },
    #[error("JPEG encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Latest-frame slot fed by a camera loop.
#[derive(Debug, Default)]
pub struct FrameSlot {
    frame: Mutex<Option<VideoFrame>>,
}

impl FrameSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: VideoFrame) {
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
    }

    /// Mark the source as stopped.
    pub fn clear(&self) {
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl VideoSource for FrameSlot {
    fn current_frame(&self) -> Option<VideoFrame> {
        self.frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// A fixed picture standing in for a camera.
#[derive(Debug, Clone)]
pub struct StillImageSource {
    frame: VideoFrame,
}

impl StillImageSource {
    pub fn open(path: &Path) -> Result<Self, image::ImageError> {
        let image = image::open(path)?.to_rgba8();
        Ok(Self::from_image(image))
    }

    #[must_use]
    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            frame: VideoFrame::new(width, height, image.into_raw()),
        }
    }

    #[must_use]
    pub fn size(&self) -> FrameSize {
        self.frame.size
    }
}

impl VideoSource for StillImageSource {
    fn current_frame(&self) -> Option<VideoFrame> {
        Some(self.frame.clone())
    }
}

/// Grab the current frame and encode it at [`JPEG_QUALITY`].
///
/// A frame that reports zero dimensions is accepted at `fallback` size only
/// when its buffer length matches exactly.
pub fn capture(
    source: &dyn VideoSource,
    fallback: FrameSize,
) -> Result<CaptureArtifact, CaptureError> {
    let frame = source.current_frame().ok_or(CaptureError::NoActiveFrame)?;
    if frame.rgba.is_empty() {
        return Err(CaptureError::NoActiveFrame);
    }

    let size = if frame.size.is_zero() {
        tracing::debug!(
            width = fallback.width,
            height = fallback.height,
            "Video source reported no dimensions, using fallback"
        );
        fallback
    } else {
        frame.size
    };

    let len = frame.rgba.len();
    let mismatch = CaptureError::FrameSizeMismatch {
        width: size.width,
        height: size.height,
        len,
    };
    if size.rgba_len() != Some(len) {
        return Err(mismatch);
    }
    let Some(image) = RgbaImage::from_raw(size.width, size.height, frame.rgba) else {
        return Err(mismatch);
    };

    let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY).encode_image(&rgb)?;

    tracing::debug!(
        width = size.width,
        height = size.height,
        bytes = buffer.len(),
        "Frame encoded"
    );
    Ok(CaptureArtifact::new(buffer, size.width, size.height))
}
