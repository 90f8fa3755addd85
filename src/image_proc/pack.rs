//! Bit-packing of monochrome frames.
//!
//! Pixel `i` of the row-major frame lands in byte `i / 8`, bit `7 - i % 8`
//! (MSB first). White pixels are 1 bits.

use super::bitmap::MonochromeBitmap;
use crate::device::BUFFER_SIZE;

/// Packed frame, always `BUFFER_SIZE` bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBitstream(Vec<u8>);

impl PackedBitstream {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Pack a frame into 8 pixels per byte
pub fn pack(bitmap: &MonochromeBitmap) -> PackedBitstream {
    let mut bytes = vec![0u8; BUFFER_SIZE];

    for (i, _) in bitmap.pixels().iter().enumerate().filter(|(_, white)| **white) {
        bytes[i / 8] |= 0x80 >> (i % 8);
    }

    tracing::debug!("Packed frame into {} bytes", bytes.len());
    PackedBitstream(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::WIDTH;

    #[test]
    fn length_is_fixed() {
        assert_eq!(pack(&MonochromeBitmap::filled(true)).len(), 5000);
        assert_eq!(pack(&MonochromeBitmap::filled(false)).len(), 5000);
        assert_eq!(pack(&MonochromeBitmap::from_fn(|x, y| (x ^ y) & 1 == 0)).len(), 5000);
    }

    #[test]
    fn white_is_one_black_is_zero() {
        let white = pack(&MonochromeBitmap::filled(true));
        let black = pack(&MonochromeBitmap::filled(false));

        assert!(white.as_bytes().iter().all(|b| *b == 0xFF));
        assert!(black.as_bytes().iter().all(|b| *b == 0x00));
    }

    #[test]
    fn bits_are_msb_first() {
        // Only the very first pixel white
        let first = pack(&MonochromeBitmap::from_fn(|x, y| x == 0 && y == 0));
        assert_eq!(first.as_bytes()[0], 0b1000_0000);
        assert!(first.as_bytes()[1..].iter().all(|b| *b == 0));

        // Pixel 7 of row 0 is the lowest bit of byte 0
        let eighth = pack(&MonochromeBitmap::from_fn(|x, y| x == 7 && y == 0));
        assert_eq!(eighth.as_bytes()[0], 0b0000_0001);
    }

    #[test]
    fn rows_continue_without_padding() {
        // 200 pixels per row = 25 bytes; (0, 1) is flattened index 200
        let bitmap = MonochromeBitmap::from_fn(|x, y| x == 0 && y == 1);
        let packed = pack(&bitmap);

        let index = WIDTH as usize;
        assert_eq!(packed.as_bytes()[index / 8], 0x80 >> (index % 8));
        assert_eq!(packed.as_bytes().iter().filter(|b| **b != 0).count(), 1);
    }

    #[test]
    fn every_bit_maps_back_to_its_pixel() {
        let bitmap = MonochromeBitmap::from_fn(|x, y| (x * 7 + y * 13) % 5 < 2);
        let packed = pack(&bitmap);

        for (i, &white) in bitmap.pixels().iter().enumerate() {
            let bit = packed.as_bytes()[i / 8] >> (7 - i % 8) & 1;
            assert_eq!(bit == 1, white, "pixel {i}");
        }
    }

    #[test]
    fn packing_is_deterministic() {
        let bitmap = MonochromeBitmap::from_fn(|x, y| (x + 3 * y) % 11 == 0);
        assert_eq!(pack(&bitmap), pack(&bitmap));
    }
}
