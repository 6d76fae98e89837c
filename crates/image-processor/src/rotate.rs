//! Geometry for thermal printer output.
//!
//! The print width is fixed by the head, so images are fitted by computing a
//! height from the source aspect ratio. Landscape sources can be turned 90
//! degrees to run along the paper feed; upside-down heads get a 180-degree
//! flip. All rotations are pure pixel remaps without interpolation.

use image::{ImageBuffer, Pixel, imageops};
use tracing::debug;

use crate::{ProcessError, Result};

/// Height that keeps the source aspect ratio at the given print width:
/// `floor(print_w * source_h / source_w)`.
///
/// A zero source dimension is a [`ProcessError::DegenerateInput`]; a fit that
/// rounds down to zero rows is a [`ProcessError::AspectOverflow`].
pub fn autofit_height(source_w: u32, source_h: u32, print_w: u32) -> Result<u32> {
    if source_w == 0 || source_h == 0 || print_w == 0 {
        return Err(ProcessError::DegenerateInput {
            width: source_w,
            height: source_h,
        });
    }

    let height = u64::from(print_w) * u64::from(source_h) / u64::from(source_w);
    match u32::try_from(height) {
        Ok(h) if h > 0 => {
            debug!(source_w, source_h, print_w, height = h, "Auto-fit height");
            Ok(h)
        }
        _ => Err(ProcessError::AspectOverflow {
            source_width: source_w,
            source_height: source_h,
            print_width: print_w,
        }),
    }
}

/// Rotate a buffer 90 degrees clockwise.
///
/// Output width equals input height and vice versa; output pixel `(x, y)`
/// comes from input pixel `(y, input_height - 1 - x)`.
pub fn rotate90<P>(img: &ImageBuffer<P, Vec<P::Subpixel>>) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
{
    let (w, h) = img.dimensions();
    debug!(w, h, "Rotating image 90 degrees");
    imageops::rotate90(img)
}

/// Rotate a buffer 180 degrees.
///
/// This is equivalent to flipping both horizontally and vertically.
pub fn rotate_180<P>(img: &ImageBuffer<P, Vec<P::Subpixel>>) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
{
    let (w, h) = img.dimensions();
    debug!(w, h, "Rotating image 180 degrees");
    imageops::rotate180(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    /// Create a test image with unique pixel values at corners.
    /// Top-left=10, Top-right=20, Bottom-left=30, Bottom-right=40
    fn create_corner_image(width: u32, height: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([128]));
        img.put_pixel(0, 0, Luma([10])); // top-left
        img.put_pixel(width - 1, 0, Luma([20])); // top-right
        img.put_pixel(0, height - 1, Luma([30])); // bottom-left
        img.put_pixel(width - 1, height - 1, Luma([40])); // bottom-right
        img
    }

    fn numbered_image(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([(y * width + x) as u8]))
    }

    #[test]
    fn test_autofit_height() {
        assert_eq!(autofit_height(800, 600, 384).unwrap(), 288);
        assert_eq!(autofit_height(1000, 333, 384).unwrap(), 127); // 127.872 floored
        assert_eq!(autofit_height(384, 384, 384).unwrap(), 384);
    }

    #[test]
    fn test_autofit_zero_dimension_is_degenerate() {
        assert!(matches!(
            autofit_height(0, 10, 384),
            Err(ProcessError::DegenerateInput { .. })
        ));
        assert!(matches!(
            autofit_height(10, 0, 384),
            Err(ProcessError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn test_autofit_extreme_aspect_is_overflow() {
        let err = autofit_height(100_000, 10, 384).unwrap_err();
        assert!(matches!(err, ProcessError::AspectOverflow { .. }));
        assert!(err.to_string().starts_with("Degenerate input"));
    }

    #[test]
    fn test_rotate90_mapping() {
        let img = numbered_image(5, 3);
        let rotated = rotate90(&img);
        assert_eq!(rotated.dimensions(), (3, 5));
        for y in 0..5 {
            for x in 0..3 {
                assert_eq!(
                    rotated.get_pixel(x, y),
                    img.get_pixel(y, 3 - 1 - x),
                    "Mismatch at ({x}, {y})"
                );
            }
        }
    }

    #[test]
    fn test_rotate90_corner_values() {
        let img = create_corner_image(6, 3);
        let result = rotate90(&img);

        assert_eq!(result.dimensions(), (3, 6));
        // Original bottom-left lands top-left, top-left lands top-right
        assert_eq!(result.get_pixel(0, 0).0[0], 30);
        assert_eq!(result.get_pixel(2, 0).0[0], 10);
        assert_eq!(result.get_pixel(2, 5).0[0], 20);
        assert_eq!(result.get_pixel(0, 5).0[0], 40);
    }

    #[test]
    fn test_rotate90_four_times_is_identity() {
        let img = numbered_image(7, 4);
        let back = rotate90(&rotate90(&rotate90(&rotate90(&img))));
        assert_eq!(back, img);
    }

    #[test]
    fn test_rotate90_twice_equals_rotate_180() {
        let img = numbered_image(5, 9);
        assert_eq!(rotate90(&rotate90(&img)), rotate_180(&img));
    }

    #[test]
    fn test_rotate_180_corner_values() {
        let img = create_corner_image(4, 4);
        let rotated = rotate_180(&img);

        assert_eq!(rotated.dimensions(), (4, 4));

        // After 180 rotation, corners swap diagonally
        assert_eq!(rotated.get_pixel(0, 0).0[0], 40); // was bottom-right
        assert_eq!(rotated.get_pixel(3, 0).0[0], 30); // was bottom-left
        assert_eq!(rotated.get_pixel(0, 3).0[0], 20); // was top-right
        assert_eq!(rotated.get_pixel(3, 3).0[0], 10); // was top-left
    }

    #[test]
    fn test_rotate_180_is_involution() {
        let img = create_corner_image(5, 7);
        assert_eq!(rotate_180(&rotate_180(&img)), img);
    }
}
