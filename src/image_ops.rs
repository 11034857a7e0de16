//! Frame processing: bounded downscale and JPEG encoding.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::RgbImage;
use tracing::trace;

use crate::error::{AttendError, DeviceError, Result};

/// Default upper bound on snapshot width in pixels.
pub const DEFAULT_MAX_WIDTH: u32 = 640;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Image file extensions accepted as frame sources.
pub const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Scale applied to a frame of `frame_width` so it fits in `max_width`.
///
/// Never upscales: the result is `min(1.0, max_width / frame_width)`.
#[must_use]
pub fn scale_factor(frame_width: u32, max_width: u32) -> f64 {
    if frame_width == 0 {
        return 1.0;
    }
    (f64::from(max_width) / f64::from(frame_width)).min(1.0)
}

/// Output dimensions after applying [`scale_factor`], aspect ratio preserved.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    let scale = scale_factor(width, max_width);
    if scale >= 1.0 {
        return (width, height);
    }
    let w = (f64::from(width) * scale).round().max(1.0) as u32;
    let h = (f64::from(height) * scale).round().max(1.0) as u32;
    (w, h)
}

/// Shrink `frame` to at most `max_width` pixels wide.
#[must_use]
pub fn downscale(frame: &RgbImage, max_width: u32) -> RgbImage {
    let (width, height) = frame.dimensions();
    let (w, h) = scaled_dimensions(width, height, max_width);
    if (w, h) == (width, height) {
        return frame.clone();
    }
    trace!(from_w = width, from_h = height, to_w = w, to_h = h, "Downscaling frame");
    image::imageops::resize(frame, w, h, FilterType::Triangle)
}

/// Encode `frame` as JPEG at `quality`.
pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> std::result::Result<Vec<u8>, DeviceError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode_image(frame)
        .map_err(|e| DeviceError::encoding_failed(e.to_string()))?;
    if buf.is_empty() {
        return Err(DeviceError::encoding_failed("encoder produced no data"));
    }
    Ok(buf)
}

/// Downscale and encode a raw frame into upload-ready bytes.
///
/// Returns the encoded bytes and the encoded dimensions. A zero-sized frame
/// means the device is not producing video yet.
pub fn encode_frame(
    frame: &RgbImage,
    max_width: u32,
    quality: u8,
) -> std::result::Result<(Vec<u8>, u32, u32), DeviceError> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(DeviceError::encoding_failed(
            "video frame has zero dimensions (device not ready)",
        ));
    }
    let scaled = downscale(frame, max_width);
    let bytes = encode_jpeg(&scaled, quality)?;
    trace!(bytes = bytes.len(), width = scaled.width(), height = scaled.height(), "Frame encoded");
    Ok((bytes, scaled.width(), scaled.height()))
}

/// True if `path` has a supported image extension.
#[must_use]
pub fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.as_str()))
}

/// Decode an image file into an RGB frame.
pub fn load_frame(path: &Path) -> Result<RgbImage> {
    if !path.exists() {
        return Err(AttendError::ImageNotFound {
            path: path.display().to_string(),
        });
    }
    let img = image::open(path).map_err(|e| AttendError::ImageProcessing(e.to_string()))?;
    Ok(img.to_rgb8())
}
