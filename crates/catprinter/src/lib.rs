//! Cat printer model table and print options.
//!
//! Describes the GB/GT/MX/YT thermal printer family closely enough for a
//! host to pick the print width and to hand a finished bitmap, together with
//! its [`PrinterOptions`], to whatever backend actually drives the device.

pub mod models;
pub mod options;

// Re-exports for convenience
pub use models::Model;
pub use options::PrinterOptions;

/// Print width in pixels (standard for GB/MXW01 series thermal printers).
pub const PRINT_WIDTH: u32 = 384;

/// Errors that can occur while selecting a printer or its options.
#[derive(Debug, thiserror::Error)]
pub enum CatPrinterError {
    #[error("Unknown printer model: {0}")]
    UnknownModel(String),

    #[error("Invalid printer option: {0}")]
    InvalidOption(String),
}

/// Result type alias for catprinter operations.
pub type Result<T> = std::result::Result<T, CatPrinterError>;
