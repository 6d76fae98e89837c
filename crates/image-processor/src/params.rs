//! Conversion parameters and the closed set of dithering algorithms.

use std::fmt;
use std::str::FromStr;

use crate::DEFAULT_HEIGHT;

/// Threshold applied when an algorithm is (re)selected: 256 / 3, floored.
pub const DEFAULT_THRESHOLD: u8 = 85;

/// Energy preset for [`Algorithm::Direct`].
pub const DIRECT_ENERGY: u8 = 96;

/// Energy preset for every other algorithm.
pub const DEFAULT_ENERGY: u8 = 64;

/// Threshold used after text has been rendered onto the canvas.
pub const TEXT_THRESHOLD: u8 = 16;

/// Recognized dithering algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Algorithm {
    /// Hard threshold, one pixel at a time.
    Direct,
    /// Floyd-Steinberg error diffusion.
    #[default]
    Steinberg,
    /// Declared but not implemented; passes luminance through.
    Halftone,
    /// Bayer 8x8 ordered dithering centered on the threshold.
    New,
    /// Error diffusion along rows only.
    NewH,
    /// Error diffusion along columns only.
    NewV,
    /// Strict threshold kept for historical output.
    Legacy,
}

impl Algorithm {
    pub const ALL: [Algorithm; 7] = [
        Algorithm::Direct,
        Algorithm::Steinberg,
        Algorithm::Halftone,
        Algorithm::New,
        Algorithm::NewH,
        Algorithm::NewV,
        Algorithm::Legacy,
    ];

    /// Identifier used in settings and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Direct => "direct",
            Algorithm::Steinberg => "steinberg",
            Algorithm::Halftone => "halftone",
            Algorithm::New => "new",
            Algorithm::NewH => "new-h",
            Algorithm::NewV => "new-v",
            Algorithm::Legacy => "legacy",
        }
    }

    /// Energy preset applied when this algorithm is selected.
    pub fn default_energy(self) -> u8 {
        if self == Algorithm::Direct {
            DIRECT_ENERGY
        } else {
            DEFAULT_ENERGY
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown algorithm identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown algorithm '{0}'")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    /// Accepts bare identifiers and the panel's `algo-` prefixed form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let name = name.strip_prefix("algo-").unwrap_or(name);
        Algorithm::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownAlgorithm(s.to_string()))
    }
}

/// Clamp an arbitrary integer into the 0..=255 range (capped, never wrapped).
pub fn clamp_level(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

/// Immutable per-conversion configuration snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameters {
    pub algorithm: Algorithm,
    pub threshold: u8,
    /// Preview contrast and diffusion strength for the directional variants.
    pub energy: u8,
    pub transparent_as_white: bool,
    /// Rotate the source 90 degrees so landscape images print along the feed.
    pub rotate: bool,
    /// Turn the packed output 180 degrees for upside-down print heads.
    pub flip: bool,
    pub target_height: u32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            threshold: DEFAULT_THRESHOLD,
            energy: DEFAULT_ENERGY,
            transparent_as_white: true,
            rotate: false,
            flip: false,
            target_height: DEFAULT_HEIGHT,
        }
    }
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: select an algorithm, leaving threshold and energy untouched.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Builder: select an algorithm and reset threshold and energy to its presets.
    pub fn using_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self.threshold = DEFAULT_THRESHOLD;
        self.energy = algorithm.default_energy();
        self
    }

    /// Builder: set threshold, clamping into 0..=255.
    pub fn with_threshold(mut self, value: i64) -> Self {
        self.threshold = clamp_level(value);
        self
    }

    /// Builder: set energy, clamping into 0..=255.
    pub fn with_energy(mut self, value: i64) -> Self {
        self.energy = clamp_level(value);
        self
    }

    pub fn with_transparent_as_white(mut self, val: bool) -> Self {
        self.transparent_as_white = val;
        self
    }

    pub fn with_rotate(mut self, val: bool) -> Self {
        self.rotate = val;
        self
    }

    pub fn with_flip(mut self, val: bool) -> Self {
        self.flip = val;
        self
    }

    /// Builder: request a canvas height. Zero is raised to one row.
    pub fn with_target_height(mut self, height: u32) -> Self {
        self.target_height = height.max(1);
        self
    }

    /// Threshold bias handed to the error-diffusion kernels: `floor(t / 2 - 64)`.
    pub fn diffusion_bias(&self) -> i32 {
        i32::from(self.threshold) / 2 - 64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identifiers() {
        assert_eq!("direct".parse::<Algorithm>(), Ok(Algorithm::Direct));
        assert_eq!("new-h".parse::<Algorithm>(), Ok(Algorithm::NewH));
        assert_eq!("algo-new-v".parse::<Algorithm>(), Ok(Algorithm::NewV));
        assert_eq!(" Legacy ".parse::<Algorithm>(), Ok(Algorithm::Legacy));
        assert!("bayer".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_display_matches_parse() {
        for algo in Algorithm::ALL {
            assert_eq!(algo.to_string().parse::<Algorithm>(), Ok(algo));
        }
    }

    #[test]
    fn test_threshold_is_capped_not_wrapped() {
        assert_eq!(Parameters::new().with_threshold(300).threshold, 255);
        assert_eq!(Parameters::new().with_threshold(-4).threshold, 0);
        assert_eq!(Parameters::new().with_energy(256).energy, 255);
        assert_eq!(Parameters::new().with_energy(42).energy, 42);
    }

    #[test]
    fn test_using_algorithm_resets_tuning() {
        let p = Parameters::new()
            .with_threshold(200)
            .with_energy(10)
            .using_algorithm(Algorithm::Direct);
        assert_eq!(p.threshold, DEFAULT_THRESHOLD);
        assert_eq!(p.energy, DIRECT_ENERGY);

        let p = p.using_algorithm(Algorithm::Steinberg);
        assert_eq!(p.energy, DEFAULT_ENERGY);
    }

    #[test]
    fn test_diffusion_bias() {
        assert_eq!(Parameters::new().with_threshold(0).diffusion_bias(), -64);
        assert_eq!(Parameters::new().with_threshold(85).diffusion_bias(), -22);
        assert_eq!(Parameters::new().with_threshold(255).diffusion_bias(), 63);
    }
}
