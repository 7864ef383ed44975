//! Image attachments for user turns
//!
//! Loads an image file, checks it against the size limit, and encodes it as
//! base64 for the model request. Attachments travel with a single turn and
//! are not stored with the session.

use crate::error::{CtutorError, Result};
use crate::providers::InlineImage;
use base64::Engine;
use image::ImageFormat;
use std::path::Path;

/// Default attachment size limit (4 MiB)
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 4 * 1024 * 1024;

/// Returns the MIME type for a supported image format
fn mime_type(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Tiff => Some("image/tiff"),
        _ => None,
    }
}

/// Load an image file as an inline attachment
///
/// The format is detected from the file contents, not the extension, and
/// the file must decode as that format.
///
/// # Errors
///
/// Returns `CtutorError::Image` if the file exceeds `max_bytes`, is not a
/// supported image, or fails to decode; IO errors if it cannot be read
pub fn load_image(path: &Path, max_bytes: u64) -> Result<InlineImage> {
    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(CtutorError::Image(format!(
            "{} is {} bytes; the limit is {} bytes",
            path.display(),
            size,
            max_bytes
        ))
        .into());
    }

    let bytes = std::fs::read(path)?;
    let format = image::guess_format(&bytes).map_err(|_| {
        CtutorError::Image(format!("{} is not a recognized image", path.display()))
    })?;
    let mime_type = mime_type(format).ok_or_else(|| {
        CtutorError::Image(format!("Unsupported image format: {:?}", format))
    })?;

    image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| CtutorError::Image(format!("Image decoding failed: {}", e)))?;

    tracing::debug!("Loaded {} attachment ({} bytes)", mime_type, size);

    Ok(InlineImage {
        mime_type: mime_type.to_string(),
        data: base64::engine::general_purpose::STANDARD.encode(&bytes),
    })
}
