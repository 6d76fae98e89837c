//! RGBA to single-channel luminance reduction.

use image::{GrayImage, Luma, RgbaImage};
use tracing::debug;

/// ITU-R BT.601 luminance, rounded to the nearest integer.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let y = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    ((y + 500) / 1000).min(255) as u8
}

/// Reduce an RGBA raster to luminance.
///
/// Any pixel below full opacity maps to white (255) when
/// `transparent_as_white` is set and to black (0) otherwise. Opaque pixels
/// keep their BT.601 luminance. Dimensions are preserved.
pub fn reduce(rgba: &RgbaImage, transparent_as_white: bool) -> GrayImage {
    let (width, height) = rgba.dimensions();
    debug!(width, height, transparent_as_white, "Reducing to luminance");

    let transparent = if transparent_as_white { 255 } else { 0 };
    let mut out = GrayImage::new(width, height);
    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = Luma([if a < 255 {
            transparent
        } else {
            luminance(r, g, b)
        }]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_luminance_extremes() {
        assert_eq!(luminance(0, 0, 0), 0);
        assert_eq!(luminance(255, 255, 255), 255);
    }

    #[test]
    fn test_luminance_weights() {
        // 0.299 * 255 = 76.245, 0.587 * 255 = 149.685, 0.114 * 255 = 29.07
        assert_eq!(luminance(255, 0, 0), 76);
        assert_eq!(luminance(0, 255, 0), 150);
        assert_eq!(luminance(0, 0, 255), 29);
        assert_eq!(luminance(128, 128, 128), 128);
    }

    #[test]
    fn test_reduce_alpha_policy() {
        let mut img = RgbaImage::new(3, 1);
        img.put_pixel(0, 0, Rgba([10, 10, 10, 255]));
        img.put_pixel(1, 0, Rgba([10, 10, 10, 254]));
        img.put_pixel(2, 0, Rgba([200, 200, 200, 0]));

        let white = reduce(&img, true);
        assert_eq!(white.as_raw(), &vec![10, 255, 255]);

        let black = reduce(&img, false);
        assert_eq!(black.as_raw(), &vec![10, 0, 0]);
    }

    #[test]
    fn test_reduce_preserves_dimensions() {
        let img = RgbaImage::new(7, 3);
        assert_eq!(reduce(&img, true).dimensions(), (7, 3));
    }
}
