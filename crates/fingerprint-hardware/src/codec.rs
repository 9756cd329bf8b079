//! Raw frame conversion for image-mode captures.

use image::ImageEncoder;
use image::codecs::png::PngEncoder;

use crate::{RawImage, Result};

/// Encode an 8-bit grayscale frame as PNG.
///
/// # Errors
///
/// Returns [`HardwareError::ImageEncoding`](crate::HardwareError::ImageEncoding)
/// if the encoder rejects the frame.
pub fn raw_to_png(image: &RawImage) -> Result<Vec<u8>> {
    let mut encoded = Vec::with_capacity(image.pixel_count() / 2);
    PngEncoder::new(&mut encoded).write_image(
        &image.data,
        image.width,
        image.height,
        image::ExtendedColorType::L8,
    )?;
    Ok(encoded)
}
