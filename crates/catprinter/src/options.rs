//! Printer configuration options.
//!
//! These travel next to a packed bitmap so the print-sending backend knows
//! how hard to burn and whether the head is mounted upside down. Dithering
//! and thresholding have already happened in the image-processor crate.

use serde::{Deserialize, Serialize};

use crate::{CatPrinterError, Result};

/// Default print speed/quality byte.
pub const DEFAULT_QUALITY: u8 = 36;

/// Default burn energy.
pub const DEFAULT_ENERGY: u8 = 64;

/// Configuration options for thermal printer output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterOptions {
    /// Print speed/quality byte sent to the device (1..=255).
    pub quality: u8,

    /// Burn energy (0..=255). Higher is darker.
    pub energy: u8,

    /// The bitmap was turned 180 degrees for an upside-down head.
    pub flip: bool,

    /// Log the job instead of handing it to the backend.
    pub dry_run: bool,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            energy: DEFAULT_ENERGY,
            flip: false,
            dry_run: false,
        }
    }
}

impl PrinterOptions {
    /// Create options with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the quality byte. Zero is rejected.
    pub fn with_quality(mut self, val: u8) -> Result<Self> {
        if val == 0 {
            return Err(CatPrinterError::InvalidOption(
                "quality must be between 1 and 255".into(),
            ));
        }
        self.quality = val;
        Ok(self)
    }

    /// Builder: set energy, clamping into 0..=255.
    pub fn with_energy(mut self, val: i64) -> Self {
        self.energy = val.clamp(0, 255) as u8;
        self
    }

    /// Builder: set flip flag.
    pub fn with_flip(mut self, val: bool) -> Self {
        self.flip = val;
        self
    }

    /// Builder: set dry-run flag.
    pub fn with_dry_run(mut self, val: bool) -> Self {
        self.dry_run = val;
        self
    }
}
