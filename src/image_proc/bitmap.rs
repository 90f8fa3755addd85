//! Fixed-size 1-bit frame matching the panel resolution.

use crate::device::{HEIGHT, WIDTH};
use image::{GrayImage, Luma};

/// Number of pixels in one frame
pub const PIXEL_COUNT: usize = WIDTH as usize * HEIGHT as usize;

/// A 200 x 200 monochrome frame, row-major, `true` = white
///
/// The dimensions are fixed by construction; every constructor fills
/// exactly `PIXEL_COUNT` pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonochromeBitmap {
    pixels: Vec<bool>,
}

impl MonochromeBitmap {
    /// Build a frame by evaluating `f(x, y)` for every pixel
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut pixels = Vec::with_capacity(PIXEL_COUNT);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                pixels.push(f(x, y));
            }
        }
        Self { pixels }
    }

    /// Frame with every pixel set to the same value
    #[allow(dead_code)]
    pub fn filled(white: bool) -> Self {
        Self {
            pixels: vec![white; PIXEL_COUNT],
        }
    }

    pub fn width(&self) -> u32 {
        WIDTH
    }

    pub fn height(&self) -> u32 {
        HEIGHT
    }

    /// Pixel value at (x, y); panics when out of bounds
    pub fn is_white(&self, x: u32, y: u32) -> bool {
        assert!(x < WIDTH && y < HEIGHT, "pixel ({x}, {y}) out of bounds");
        self.pixels[(y * WIDTH + x) as usize]
    }

    /// Row-major pixel values
    pub fn pixels(&self) -> &[bool] {
        &self.pixels
    }

    /// Render as an 8-bit grayscale image (0 or 255)
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            Luma([if self.is_white(x, y) { 255 } else { 0 }])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fn_is_row_major() {
        let bitmap = MonochromeBitmap::from_fn(|x, y| x == 3 && y == 1);

        assert_eq!(bitmap.pixels().len(), PIXEL_COUNT);
        assert!(bitmap.pixels()[WIDTH as usize + 3]);
        assert_eq!(bitmap.pixels().iter().filter(|p| **p).count(), 1);
        assert!(bitmap.is_white(3, 1));
        assert!(!bitmap.is_white(1, 3));
    }

    #[test]
    fn gray_rendering_matches_pixels() {
        let bitmap = MonochromeBitmap::from_fn(|x, _| x % 2 == 0);
        let gray = bitmap.to_gray_image();

        assert_eq!(gray.dimensions(), (WIDTH, HEIGHT));
        assert_eq!(gray.get_pixel(0, 10).0[0], 255);
        assert_eq!(gray.get_pixel(1, 10).0[0], 0);
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_access_panics() {
        MonochromeBitmap::filled(true).is_white(WIDTH, 0);
    }
}
