//! Thumbnail processor - generates thumbnails from original images
//!
//! Decodes an image, scales it to fit inside the configured bound while
//! maintaining aspect ratio (never upscaling), and re-encodes it in the
//! source format.
//!
//! Uses `spawn_blocking` for CPU-intensive operations to avoid blocking the
//! async runtime.

use crate::error::{Result, WorkerError};
use bytes::Bytes;
use image::error::ImageError;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat};
use serde::Deserialize;
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

/// Configuration for thumbnail generation
#[derive(Clone, Debug, Deserialize)]
pub struct ThumbnailConfig {
    /// Maximum width in pixels
    pub max_width: u32,
    /// Maximum height in pixels
    pub max_height: u32,
    /// JPEG quality (1-100), applied only to JPEG sources
    pub jpeg_quality: u8,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_width: 100,
            max_height: 100,
            jpeg_quality: 85,
        }
    }
}

/// Result of thumbnail generation
#[derive(Debug, Clone)]
pub struct ThumbnailResult {
    /// Encoded thumbnail bytes, in the source image's format
    pub data: Bytes,
    /// Width of the thumbnail
    pub width: u32,
    /// Height of the thumbnail
    pub height: u32,
    /// Format the thumbnail was encoded in
    pub format: ImageFormat,
}

impl ThumbnailResult {
    /// MIME type matching the encoded format.
    pub fn content_type(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Tiff => "image/tiff",
            _ => "application/octet-stream",
        }
    }
}

/// Thumbnail processor
pub struct ThumbnailProcessor {
    config: ThumbnailConfig,
}

impl ThumbnailProcessor {
    /// Create a new processor with the given configuration
    pub fn new(config: ThumbnailConfig) -> Self {
        Self { config }
    }

    /// Create a processor with default configuration
    pub fn with_defaults() -> Self {
        Self::new(ThumbnailConfig::default())
    }

    /// Generate a thumbnail from the given image data (blocking version)
    ///
    /// **Note:** This method performs CPU-intensive operations and should not
    /// be called directly from async code. Use `generate_async` instead.
    pub fn generate(&self, original: &[u8]) -> Result<ThumbnailResult> {
        let format = image::guess_format(original).map_err(|e| {
            WorkerError::UnsupportedImageFormat(format!("could not determine format: {e}"))
        })?;

        let img = image::load_from_memory_with_format(original, format).map_err(|e| match e {
            ImageError::Unsupported(u) => WorkerError::UnsupportedImageFormat(u.to_string()),
            other => WorkerError::DecodeError(other.to_string()),
        })?;

        let (orig_w, orig_h) = img.dimensions();
        debug!(
            original_width = orig_w,
            original_height = orig_h,
            format = ?format,
            "processing image for thumbnail"
        );

        // Never upscale: an image already within bounds is re-encoded as-is.
        if orig_w <= self.config.max_width && orig_h <= self.config.max_height {
            let data = self.encode(&img, format)?;
            return Ok(ThumbnailResult {
                data,
                width: orig_w,
                height: orig_h,
                format,
            });
        }

        let (new_w, new_h) = self.fit_dimensions(orig_w, orig_h);
        let resized = img.resize_exact(new_w, new_h, FilterType::Triangle);
        let data = self.encode(&resized, format)?;

        debug!(
            width = new_w,
            height = new_h,
            size = data.len(),
            "thumbnail generated"
        );

        Ok(ThumbnailResult {
            data,
            width: new_w,
            height: new_h,
            format,
        })
    }

    /// Generate a thumbnail asynchronously using a blocking thread pool
    pub async fn generate_async(self: Arc<Self>, original: Bytes) -> Result<ThumbnailResult> {
        let processor = self.clone();

        tokio::task::spawn_blocking(move || processor.generate(&original))
            .await
            .map_err(|e| WorkerError::DecodeError(format!("thumbnail task panicked: {e}")))?
    }

    /// Largest dimensions that fit inside the configured bound while keeping
    /// the source aspect ratio. Scale factor is capped at 1.
    fn fit_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = f32::min(
            self.config.max_width as f32 / width as f32,
            self.config.max_height as f32 / height as f32,
        )
        .min(1.0);

        let new_w = ((width as f32) * scale).round().max(1.0) as u32;
        let new_h = ((height as f32) * scale).round().max(1.0) as u32;
        (new_w, new_h)
    }

    /// Re-encode in the source format, honoring JPEG quality for JPEG input.
    fn encode(&self, img: &DynamicImage, format: ImageFormat) -> Result<Bytes> {
        let output = match format {
            ImageFormat::Jpeg => ImageOutputFormat::Jpeg(self.config.jpeg_quality),
            other => ImageOutputFormat::from(other),
        };

        let mut buf = Vec::new();
        let mut cursor = Cursor::new(&mut buf);
        img.write_to(&mut cursor, output)
            .map_err(|e| WorkerError::UnsupportedImageFormat(format!("cannot encode: {e}")))?;

        Ok(Bytes::from(buf))
    }
}
