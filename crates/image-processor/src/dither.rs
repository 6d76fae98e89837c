//! Dithering algorithms for converting grayscale images to black-and-white.
//!
//! Every kernel takes ownership of a luminance buffer and returns a buffer of
//! the same shape whose samples are exactly 0 or 255. [`dither`] dispatches on
//! [`Algorithm`] and pre-adjusts the threshold for the diffusion kernels.
//!
//! | Algorithm | Rule | Feedback |
//! |-----------|------|----------|
//! | `direct` | white iff `lum >= t` | no |
//! | `legacy` | white iff `lum > t` | no |
//! | `new` | Bayer 8x8 ordered, centered on `t` | no |
//! | `steinberg` | Floyd-Steinberg, cutoff `128 + bias` | yes |
//! | `new-h` | error carried right along the row, `energy / 255` of it | yes |
//! | `new-v` | error carried down the column, `energy / 255` of it | yes |
//! | `halftone` | not implemented, luminance passes through | - |

use image::GrayImage;
use tracing::{debug, warn};

use crate::PipelineWarning;
use crate::params::{Algorithm, Parameters};

/// Bayer 8x8 ordered dithering matrix (values 0-63).
pub const BAYER8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// Output of [`dither`]: the processed buffer plus any soft warning.
#[derive(Debug, Clone)]
pub struct Dithered {
    pub image: GrayImage,
    pub warning: Option<PipelineWarning>,
}

/// Run the selected algorithm over a luminance buffer.
///
/// `halftone` leaves the buffer untouched and reports
/// [`PipelineWarning::UnsupportedAlgorithm`] instead of failing.
pub fn dither(lum: GrayImage, params: &Parameters) -> Dithered {
    let (t, energy) = (params.threshold, params.energy);
    debug!(
        algorithm = %params.algorithm,
        threshold = t,
        energy,
        "Dithering"
    );

    let image = match params.algorithm {
        Algorithm::Direct => threshold_convert(lum, t),
        Algorithm::Legacy => legacy_threshold(lum, t),
        Algorithm::New => ordered_dither(lum, t),
        Algorithm::Steinberg => floyd_steinberg_dither(lum, params.diffusion_bias()),
        Algorithm::NewH => row_diffusion(lum, params.diffusion_bias(), energy),
        Algorithm::NewV => column_diffusion(lum, t, energy),
        Algorithm::Halftone => {
            let warning = PipelineWarning::UnsupportedAlgorithm(Algorithm::Halftone);
            warn!("{warning}");
            return Dithered {
                image: lum,
                warning: Some(warning),
            };
        }
    };

    Dithered {
        image,
        warning: None,
    }
}

#[inline]
fn binarize(white: bool) -> u8 {
    if white { 255 } else { 0 }
}

/// Simple threshold conversion without dithering.
///
/// Pixels with values >= `threshold` become white (255), others become black (0).
pub fn threshold_convert(mut img: GrayImage, threshold: u8) -> GrayImage {
    for px in img.pixels_mut() {
        px.0[0] = binarize(px.0[0] >= threshold);
    }
    img
}

/// Threshold rule of the historical converter: the threshold level itself
/// prints black.
pub fn legacy_threshold(mut img: GrayImage, threshold: u8) -> GrayImage {
    for px in img.pixels_mut() {
        px.0[0] = binarize(px.0[0] > threshold);
    }
    img
}

/// Ordered dithering against a Bayer 8x8 screen shifted by `threshold`.
///
/// The matrix cell `m` is scaled to `4m + 2` (2..=254, mean 128). A pixel is
/// white iff `lum >= threshold + (4m + 2) - 128`, so `threshold = 128` yields
/// the classic screen and lower thresholds lighten the output.
pub fn ordered_dither(mut img: GrayImage, threshold: u8) -> GrayImage {
    let shift = i32::from(threshold) - 128;
    for (x, y, px) in img.enumerate_pixels_mut() {
        let cell = i32::from(BAYER8[(y & 7) as usize][(x & 7) as usize]) * 4 + 2;
        px.0[0] = binarize(i32::from(px.0[0]) >= cell + shift);
    }
    img
}

/// Apply Floyd-Steinberg dithering to a grayscale image.
///
/// Pixels are visited in row-major order; each accumulated value is
/// quantized white when it reaches `128 + bias`. Error distribution pattern:
/// - Right:        7/16
/// - Bottom-left:  3/16
/// - Bottom:       5/16
/// - Bottom-right: 1/16
pub fn floyd_steinberg_dither(img: GrayImage, bias: i32) -> GrayImage {
    let (width, height) = img.dimensions();
    debug!(width, height, bias, "Applying Floyd-Steinberg dithering");

    let (w, h) = (width as usize, height as usize);
    let cutoff = 128 + bias;
    // Work with i32 buffer to handle error diffusion overflow
    let mut buffer: Vec<i32> = img.as_raw().iter().map(|&v| i32::from(v)).collect();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let old_pixel = buffer[idx];
            let new_pixel = if old_pixel >= cutoff { 255 } else { 0 };
            buffer[idx] = new_pixel;
            distribute_error(&mut buffer, x, y, w, h, old_pixel - new_pixel);
        }
    }

    let mut output = img;
    for (dst, &val) in output.iter_mut().zip(&buffer) {
        *dst = val as u8;
    }
    debug!("Floyd-Steinberg dithering complete");
    output
}

/// Distribute quantization error to neighboring pixels.
fn distribute_error(buffer: &mut [i32], x: usize, y: usize, w: usize, h: usize, error: i32) {
    let idx = y * w + x;

    // Right: 7/16
    if x + 1 < w {
        buffer[idx + 1] += error * 7 / 16;
    }
    if y + 1 < h {
        let below = idx + w;
        // Bottom-left: 3/16
        if x > 0 {
            buffer[below - 1] += error * 3 / 16;
        }
        // Bottom: 5/16
        buffer[below] += error * 5 / 16;
        // Bottom-right: 1/16
        if x + 1 < w {
            buffer[below + 1] += error / 16;
        }
    }
}

/// Horizontal-biased diffusion: each pixel's quantization error is carried
/// only to its right neighbour, scaled by `energy / 255`. Cutoff is
/// `128 + bias` as in Floyd-Steinberg. Runs restart at every row, so the
/// pattern forms horizontal runs.
pub fn row_diffusion(mut img: GrayImage, bias: i32, energy: u8) -> GrayImage {
    let width = img.width() as usize;
    let cutoff = 128 + bias;
    let energy = i32::from(energy);

    for row in img.chunks_exact_mut(width.max(1)) {
        let mut carry = 0i32;
        for px in row.iter_mut() {
            let acc = i32::from(*px) + carry;
            let out = if acc >= cutoff { 255 } else { 0 };
            carry = (acc - out) * energy / 255;
            *px = out as u8;
        }
    }
    img
}

/// Vertical-biased diffusion: each pixel's quantization error is carried
/// only to the pixel below it, scaled by `energy / 255`. Cutoff is the raw
/// threshold. Processed in row-major order with one carry slot per column,
/// so the pattern forms vertical runs.
pub fn column_diffusion(mut img: GrayImage, threshold: u8, energy: u8) -> GrayImage {
    let width = img.width() as usize;
    let cutoff = i32::from(threshold);
    let energy = i32::from(energy);
    let mut carry = vec![0i32; width];

    for row in img.chunks_exact_mut(width.max(1)) {
        for (px, slot) in row.iter_mut().zip(carry.iter_mut()) {
            let acc = i32::from(*px) + *slot;
            let out = if acc >= cutoff { 255 } else { 0 };
            *slot = (acc - out) * energy / 255;
            *px = out as u8;
        }
    }
    img
}
