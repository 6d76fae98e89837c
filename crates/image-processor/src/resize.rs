//! Decoding and fitting source images to the print width.
//!
//! Uses Lanczos3 filtering for high-quality downsampling.

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use tracing::debug;

use crate::rotate::{autofit_height, rotate90};
use crate::{ProcessError, Result};

/// Decode an encoded image (PNG, JPEG, ...) from memory.
///
/// Decode failures and empty images are hard errors.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let img = image::load_from_memory(bytes)?;
    if img.width() == 0 || img.height() == 0 {
        return Err(ProcessError::DegenerateInput {
            width: img.width(),
            height: img.height(),
        });
    }
    debug!(width = img.width(), height = img.height(), "Decoded image");
    Ok(img)
}

/// Scale an image onto an RGBA canvas exactly `print_width` pixels wide.
///
/// Without rotation the height is auto-fitted from the aspect ratio. With
/// rotation the source is first scaled to `(autofit, print_width)` and then
/// turned 90 degrees, so its original width runs along the paper feed.
pub fn fit_to_width(img: &DynamicImage, print_width: u32, rotate: bool) -> Result<RgbaImage> {
    let (orig_w, orig_h) = (img.width(), img.height());

    if rotate {
        let height = autofit_height(orig_h, orig_w, print_width)?;
        debug!(orig_w, orig_h, print_width, height, "Fitting rotated image");
        let intermediate = img
            .resize_exact(height, print_width, FilterType::Lanczos3)
            .to_rgba8();
        return Ok(rotate90(&intermediate));
    }

    let height = autofit_height(orig_w, orig_h, print_width)?;
    if orig_w == print_width && orig_h == height {
        debug!(print_width, "Image already at target width, skipping resize");
        return Ok(img.to_rgba8());
    }

    debug!(
        orig_w,
        orig_h,
        new_width = print_width,
        new_height = height,
        "Resizing image to print width"
    );
    Ok(img
        .resize_exact(print_width, height, FilterType::Lanczos3)
        .to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    /// Create a test DynamicImage with given dimensions.
    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        let gray = GrayImage::from_pixel(width, height, Luma([128]));
        DynamicImage::ImageLuma8(gray)
    }

    #[test]
    fn test_fit_downscale() {
        let img = create_test_image(800, 600);
        let result = fit_to_width(&img, 400, false).unwrap();
        assert_eq!(result.dimensions(), (400, 300));
    }

    #[test]
    fn test_fit_upscale_floors_height() {
        let img = create_test_image(100, 33);
        let result = fit_to_width(&img, 384, false).unwrap();
        assert_eq!(result.dimensions(), (384, 126)); // 126.72 floored
    }

    #[test]
    fn test_fit_same_size_keeps_pixels() {
        let img = create_test_image(384, 10);
        let result = fit_to_width(&img, 384, false).unwrap();
        assert_eq!(result.dimensions(), (384, 10));
        assert_eq!(result.get_pixel(0, 0).0, [128, 128, 128, 255]);
    }

    #[test]
    fn test_fit_rotated_uses_source_width_for_height() {
        // Landscape 600x200 rotated: height = floor(384 * 600 / 200)
        let img = create_test_image(600, 200);
        let result = fit_to_width(&img, 384, true).unwrap();
        assert_eq!(result.dimensions(), (384, 1152));
    }

    #[test]
    fn test_fit_extreme_aspect_fails() {
        let img = create_test_image(5000, 1);
        assert!(matches!(
            fit_to_width(&img, 384, false),
            Err(ProcessError::AspectOverflow { .. })
        ));
    }

    #[test]
    fn test_decode_png() {
        let img = create_test_image(3, 2);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        let decoded = decode_image(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            decode_image(b"definitely not an image"),
            Err(ProcessError::Decode(_))
        ));
    }
}
