//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use image_processor::{Algorithm, Align, Parameters};

/// catprint - Thermal cat printer bitmap utility
#[derive(Parser, Debug)]
#[command(name = "catprint")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings and spool directory (default: $CATPRINT_DATA_DIR or ~/.catprint)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert an image into a packed bitmap
    Convert(ConvertArgs),

    /// Render text into a packed bitmap
    Text(TextArgs),

    /// Tune an image interactively: reads `key=value` lines from stdin
    Watch(WatchArgs),

    /// List known printer models
    Models,

    /// Inspect or change stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

/// Per-job overrides of the stored image settings.
#[derive(Args, Debug, Clone, Default)]
pub struct TuningArgs {
    /// Dithering algorithm (resets threshold and energy to its presets)
    #[arg(long)]
    pub algorithm: Option<Algorithm>,

    /// Threshold 0-255; out-of-range values are capped
    #[arg(long, allow_hyphen_values = true)]
    pub threshold: Option<i64>,

    /// Energy 0-255; out-of-range values are capped
    #[arg(long, allow_hyphen_values = true)]
    pub energy: Option<i64>,

    /// Rotate 90 degrees so the image prints along the feed
    #[arg(long, overrides_with = "no_rotate")]
    pub rotate: bool,

    /// Do not rotate, even if the ROTATE setting is on
    #[arg(long, overrides_with = "rotate")]
    pub no_rotate: bool,

    /// Turn the output 180 degrees
    #[arg(long, overrides_with = "no_flip")]
    pub flip: bool,

    /// Do not flip, even if the FLIP setting is on
    #[arg(long, overrides_with = "flip")]
    pub no_flip: bool,

    /// Treat transparent pixels as black instead of white
    #[arg(long, overrides_with = "transparent_as_white")]
    pub transparent_as_black: bool,

    /// Treat transparent pixels as white, even if the stored setting says black
    #[arg(long, overrides_with = "transparent_as_black")]
    pub transparent_as_white: bool,
}

/// Resolve a `--x` / `--no-x` pair; `None` keeps the stored setting.
pub fn toggle(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl TuningArgs {
    pub fn apply(&self, base: Parameters) -> Parameters {
        let mut p = base;
        if let Some(algorithm) = self.algorithm {
            p = p.using_algorithm(algorithm);
        }
        if let Some(t) = self.threshold {
            p = p.with_threshold(t);
        }
        if let Some(e) = self.energy {
            p = p.with_energy(e);
        }
        if let Some(rotate) = toggle(self.rotate, self.no_rotate) {
            p = p.with_rotate(rotate);
        }
        if let Some(flip) = toggle(self.flip, self.no_flip) {
            p = p.with_flip(flip);
        }
        if let Some(white) = toggle(self.transparent_as_white, self.transparent_as_black) {
            p = p.with_transparent_as_white(white);
        }
        p
    }
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input image (PNG, JPEG, GIF, BMP, WebP)
    pub input: PathBuf,

    /// Write the PBM here instead of spooling it
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Save an on-screen preview PNG
    #[arg(long, value_name = "FILE")]
    pub preview: Option<PathBuf>,

    #[command(flatten)]
    pub tuning: TuningArgs,
}

#[derive(Args, Debug)]
pub struct TextArgs {
    /// Text to print, or `-` to read stdin
    pub text: String,

    /// Write the PBM here instead of spooling it
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Save an on-screen preview PNG
    #[arg(long, value_name = "FILE")]
    pub preview: Option<PathBuf>,

    /// TTF/OTF font (default: FONT_PATH setting)
    #[arg(long, value_name = "FILE")]
    pub font: Option<PathBuf>,

    /// Font size in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(4..=256))]
    pub size: Option<u32>,

    /// Line alignment
    #[arg(long)]
    pub align: Option<Align>,

    /// Break lines anywhere instead of at spaces
    #[arg(long)]
    pub no_wrap_by_space: bool,

    /// Turn the output 180 degrees
    #[arg(long, overrides_with = "no_flip")]
    pub flip: bool,

    /// Do not flip, even if the FLIP setting is on
    #[arg(long, overrides_with = "flip")]
    pub no_flip: bool,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Input image
    pub input: PathBuf,

    /// Keep this PNG updated with the latest preview
    #[arg(long, value_name = "FILE")]
    pub preview: Option<PathBuf>,

    /// Write committed bitmaps here instead of spooling them
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Print one setting
    Get { key: String },
    /// Validate and store a setting
    Set { key: String, value: String },
    /// Print every setting
    List,
}
