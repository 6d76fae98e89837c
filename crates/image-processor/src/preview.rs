//! On-screen preview rasters.
//!
//! Energy does not change the packed bitmap; it only darkens and sharpens
//! the preview to hint at how hard the head will burn.

use image::{GrayImage, Rgba, RgbaImage};

/// Brightness/contrast pair derived from the energy setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyFilter {
    pub brightness: f32,
    pub contrast: f32,
}

impl EnergyFilter {
    /// `rate = energy / 256`, `brightness = max(1.6 - 1.5 rate, 0.75)`,
    /// `contrast = 1 + 2 rate`.
    pub fn from_energy(energy: u8) -> Self {
        let rate = f32::from(energy) / 256.0;
        Self {
            brightness: (1.6 - rate * 1.5).max(0.75),
            contrast: 1.0 + rate * 2.0,
        }
    }

    /// Apply brightness then contrast to one sample, CSS filter style.
    pub fn apply(&self, value: u8) -> u8 {
        let v = f32::from(value) / 255.0 * self.brightness;
        let v = (v - 0.5) * self.contrast + 0.5;
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

/// Replicate each sample across R, G and B with full opacity.
pub fn to_rgba(mono: &GrayImage) -> RgbaImage {
    RgbaImage::from_fn(mono.width(), mono.height(), |x, y| {
        let v = mono.get_pixel(x, y).0[0];
        Rgba([v, v, v, 255])
    })
}

/// Like [`to_rgba`] with the energy filter baked in.
pub fn to_rgba_filtered(mono: &GrayImage, filter: EnergyFilter) -> RgbaImage {
    let lut: Vec<u8> = (0..=255u8).map(|v| filter.apply(v)).collect();
    RgbaImage::from_fn(mono.width(), mono.height(), |x, y| {
        let v = lut[usize::from(mono.get_pixel(x, y).0[0])];
        Rgba([v, v, v, 255])
    })
}
