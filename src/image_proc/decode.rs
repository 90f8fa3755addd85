//! Image decoding from raw bytes.
//!
//! The format is sniffed from the content; file names and MIME types
//! supplied by clients are ignored.

use image::{DynamicImage, ImageReader, Limits};
use std::io::Cursor;
use thiserror::Error;

/// Decoder memory budget; bounds total pixels, not the aspect ratio
pub const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

/// Decode errors
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Empty image data")]
    Empty,

    #[error("Failed to read image data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Decode an uploaded or downloaded image
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    tracing::debug!("Decoding {} bytes of image data", bytes.len());

    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;

    let mut limits = Limits::default();
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    reader.limits(limits);

    let img = reader.decode()?;
    tracing::info!("Image decoded: {}x{}", img.width(), img.height());

    Ok(img)
}
