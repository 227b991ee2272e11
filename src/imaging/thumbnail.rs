use image::{imageops::FilterType, ImageFormat};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::browser::MediaKind;

/// Default edge length of generated thumbnails (square box)
pub const THUMBNAIL_SIZE: u32 = 256;

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("Thumbnail I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode or encode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Generate an encoded JPEG thumbnail for an image file
///
/// The image is resized to fit inside a `size` x `size` box, keeping
/// its aspect ratio. Images already smaller than the box are not upscaled.
pub fn thumbnail_bytes(path: &Path, size: u32) -> Result<Vec<u8>, ThumbnailError> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;

    let thumbnail = if img.width() > size || img.height() > size {
        img.resize(size, size, FilterType::Lanczos3)
    } else {
        img
    };

    // JPEG has no alpha channel
    let rgb = thumbnail.to_rgb8();

    let mut bytes = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)?;

    debug!(
        path = %path.display(),
        width = rgb.width(),
        height = rgb.height(),
        bytes = bytes.len(),
        "Generated thumbnail"
    );

    Ok(bytes)
}

/// Thumbnail to store with a new item of `kind`
///
/// Only images get one. A file that cannot be decoded is logged and yields
/// `None`, so the item can still be catalogued.
pub fn item_thumbnail(path: &Path, kind: MediaKind, size: u32) -> Option<Vec<u8>> {
    if kind != MediaKind::Image {
        return None;
    }

    match thumbnail_bytes(path, size) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "No thumbnail");
            None
        }
    }
}
