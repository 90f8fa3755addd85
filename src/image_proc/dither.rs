//! Floyd-Steinberg dithering to 1-bit monochrome.
//!
//! Converts RGB pixels to luminance and quantizes them to black or white
//! using error diffusion.
//!
//! Like the panel driver, this keeps only 2 rows of accumulated error in
//! memory at a time instead of a full-frame buffer.

use super::bitmap::MonochromeBitmap;
use crate::device::{HEIGHT, WIDTH};
use image::{GrayImage, Luma, RgbImage};

/// Luminance at or above this becomes white
pub const THRESHOLD: i16 = 128;

/// ITU-R 601-2 luma transform in 16.16 fixed point
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as u8
}

/// Apply Floyd-Steinberg dithering to an RGB image
///
/// Returns a grayscale image of the same size whose pixels are either
/// 0 or 255.
///
/// Error distribution pattern:
/// - Right:        7/16
/// - Bottom-left:  3/16
/// - Bottom:       5/16
/// - Bottom-right: 1/16
pub fn dither_image(img: &RgbImage) -> GrayImage {
    let (width, height) = img.dimensions();
    let width_usize = width as usize;

    tracing::debug!("Applying 1-bit Floyd-Steinberg dithering ({}x{})", width, height);

    // Luminance error range is -255..=255, fits in i16
    let mut curr_row: Vec<i16> = vec![0; width_usize];
    let mut next_row: Vec<i16> = vec![0; width_usize];

    let mut result = GrayImage::new(width, height);

    for y in 0..height {
        // Load current row luminance on top of the error carried from above
        for (x, acc) in curr_row.iter_mut().enumerate() {
            let p = img.get_pixel(x as u32, y);
            *acc += luma(p[0], p[1], p[2]) as i16;
        }

        for x in 0..width_usize {
            let value = curr_row[x].clamp(0, 255);
            let white = value >= THRESHOLD;
            let err = value - if white { 255 } else { 0 };

            if x + 1 < width_usize {
                curr_row[x + 1] += err * 7 / 16;
            }

            if y + 1 < height {
                if x > 0 {
                    next_row[x - 1] += err * 3 / 16;
                }
                next_row[x] += err * 5 / 16;
                if x + 1 < width_usize {
                    next_row[x + 1] += err / 16;
                }
            }

            result.put_pixel(x as u32, y, Luma([if white { 255 } else { 0 }]));
        }

        std::mem::swap(&mut curr_row, &mut next_row);
        next_row.iter_mut().for_each(|e| *e = 0);
    }

    result
}

/// Dither a panel-sized RGB image into a frame
///
/// `img` must already be `WIDTH` x `HEIGHT`.
pub fn quantize(img: &RgbImage) -> MonochromeBitmap {
    debug_assert_eq!(img.dimensions(), (WIDTH, HEIGHT));
    let dithered = dither_image(img);
    MonochromeBitmap::from_fn(|x, y| dithered.get_pixel(x, y).0[0] == 255)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let v = ((x + y) * 255 / (width + height - 2)) as u8;
            Rgb([v, v, v])
        })
    }

    #[test]
    fn luma_extremes_are_exact() {
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 255, 255), 255);
        // Green dominates perceived brightness
        assert!(luma(0, 255, 0) > luma(255, 0, 0));
        assert!(luma(255, 0, 0) > luma(0, 0, 255));
    }

    #[test]
    fn output_is_binary_and_same_size() {
        let result = dither_image(&gradient(17, 9));

        assert_eq!(result.dimensions(), (17, 9));
        assert!(result.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn solid_inputs_stay_solid() {
        let white = dither_image(&RgbImage::from_pixel(6, 6, Rgb([255, 255, 255])));
        let black = dither_image(&RgbImage::from_pixel(6, 6, Rgb([0, 0, 0])));

        assert!(white.pixels().all(|p| p.0[0] == 255));
        assert!(black.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn mid_gray_dithers_to_roughly_half_white() {
        let img = RgbImage::from_pixel(40, 40, Rgb([128, 128, 128]));
        let result = dither_image(&img);

        let white = result.pixels().filter(|p| p.0[0] == 255).count();
        let ratio = white as f64 / (40.0 * 40.0);
        assert!((0.4..=0.6).contains(&ratio), "white ratio {ratio}");
    }

    #[test]
    fn first_pixel_uses_plain_threshold() {
        let mut img = RgbImage::from_pixel(3, 1, Rgb([200, 200, 200]));
        img.put_pixel(0, 0, Rgb([127, 127, 127]));
        assert_eq!(dither_image(&img).get_pixel(0, 0).0[0], 0);

        img.put_pixel(0, 0, Rgb([128, 128, 128]));
        assert_eq!(dither_image(&img).get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn quantize_produces_panel_frame() {
        let img = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([255, 255, 255]));
        let bitmap = quantize(&img);

        assert_eq!(bitmap.pixels().len(), (WIDTH * HEIGHT) as usize);
        assert!(bitmap.pixels().iter().all(|p| *p));
    }
}
