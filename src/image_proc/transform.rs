//! Image enhancement and scaling for display preparation.
//!
//! Order is fixed: RGB conversion → contrast → sharpen → resize → dither.
//! Reordering the stages changes the resulting frame.

use super::bitmap::MonochromeBitmap;
use super::dither::{luma, quantize};
use crate::device::{HEIGHT, WIDTH};
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

/// Contrast multiplier applied before sharpening
pub const CONTRAST_FACTOR: f32 = 2.0;

/// 3x3 sharpen kernel, row-major
const SHARPEN_KERNEL: [i32; 9] = [-2, -2, -2, -2, 32, -2, -2, -2, -2];
const SHARPEN_DIVISOR: i32 = 16;

/// Transform a decoded image into a panel frame
///
/// The image is stretched to exactly `WIDTH` x `HEIGHT`; aspect ratio is
/// not preserved.
pub fn transform_image(img: DynamicImage) -> MonochromeBitmap {
    let (src_width, src_height) = (img.width(), img.height());
    let rgb = img.into_rgb8();

    let contrasted = enhance_contrast(&rgb, CONTRAST_FACTOR);
    let sharpened = sharpen(&contrasted);

    tracing::debug!(
        "Scaling {}x{} -> {}x{} (stretch)",
        src_width,
        src_height,
        WIDTH,
        HEIGHT
    );
    let resized = image::imageops::resize(&sharpened, WIDTH, HEIGHT, FilterType::Lanczos3);

    quantize(&resized)
}

/// Mean luminance of the image, rounded
fn mean_luma(img: &RgbImage) -> u8 {
    let count = img.width() as u64 * img.height() as u64;
    if count == 0 {
        return 0;
    }

    let sum: u64 = img
        .pixels()
        .map(|p| luma(p[0], p[1], p[2]) as u64)
        .sum();

    ((sum + count / 2) / count) as u8
}

/// Scale contrast by `factor` around the mean luminance
///
/// Each channel becomes `mean + (v - mean) * factor`, clamped to 0..=255.
pub fn enhance_contrast(img: &RgbImage, factor: f32) -> RgbImage {
    let pivot = mean_luma(img) as f32;
    tracing::debug!("Contrast x{} around mean luminance {}", factor, pivot);

    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            let v = pivot + (*channel as f32 - pivot) * factor;
            *channel = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Apply the 3x3 sharpen kernel
///
/// Edge pixels have an incomplete neighbourhood and are copied unchanged.
pub fn sharpen(img: &RgbImage) -> RgbImage {
    let (width, height) = img.dimensions();
    let mut out = img.clone();

    if width < 3 || height < 3 {
        return out;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut acc = [0i32; 3];
            for (i, weight) in SHARPEN_KERNEL.iter().enumerate() {
                let sx = x + (i as u32 % 3) - 1;
                let sy = y + (i as u32 / 3) - 1;
                let p = img.get_pixel(sx, sy);
                for (c, sum) in acc.iter_mut().enumerate() {
                    *sum += weight * p[c] as i32;
                }
            }

            let target = out.get_pixel_mut(x, y);
            for (c, sum) in acc.iter().enumerate() {
                let v = (sum + SHARPEN_DIVISOR / 2).div_euclid(SHARPEN_DIVISOR);
                target[c] = v.clamp(0, 255) as u8;
            }
        }
    }

    out
}
