//! Image processing pipeline for thermal printer output.
//!
//! Turns a decoded image (or rendered text) into a 1-bit bitmap for a
//! fixed-width print head: grayscale reduction, dithering (threshold,
//! Floyd-Steinberg, ordered and directional variants), 90/180-degree
//! rotation, word-wrapped text rendering and PBM (`P4`) packing.
//! [`Controller`] ties the stages together for an interactive panel.

pub mod dither;
pub mod grayscale;
pub mod pack;
pub mod params;
pub mod pipeline;
pub mod preview;
pub mod resize;
pub mod rotate;
pub mod text;

// Re-exports for convenience
pub use dither::{Dithered, dither, floyd_steinberg_dither, threshold_convert};
pub use grayscale::reduce;
pub use pack::PackedBitmap;
pub use params::{Algorithm, Parameters};
pub use pipeline::{Controller, Preview, convert, pack_preview};
pub use preview::EnergyFilter;
pub use resize::{decode_image, fit_to_width};
pub use rotate::{autofit_height, rotate_180, rotate90};
pub use text::{Align, TextStyle};

/// Canvas height used before any content is loaded.
pub const DEFAULT_HEIGHT: u32 = 384;

/// Errors raised by the conversion pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Degenerate input: raster is {width}x{height}")]
    DegenerateInput { width: u32, height: u32 },

    #[error(
        "Degenerate input: a {source_width}x{source_height} image fitted to {print_width}px has no rows"
    )]
    AspectOverflow {
        source_width: u32,
        source_height: u32,
        print_width: u32,
    },

    #[error("Text is empty")]
    EmptyText,

    #[error("Nothing to print: no image or text has been loaded")]
    NothingToPrint,

    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Invalid bitmap: {0}")]
    InvalidBitmap(String),
}

/// Non-fatal conditions reported alongside a conversion result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PipelineWarning {
    #[error("Algorithm '{0}' is not yet supported; output was left undithered")]
    UnsupportedAlgorithm(Algorithm),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ProcessError>;
