//! Conversion controller for an interactive print panel.
//!
//! The controller owns the current [`Parameters`] and the working RGBA
//! canvas. Every change re-derives the preview from scratch
//! (reduce, then dither); nothing is patched incrementally. Each derivation
//! bumps a generation counter and replaces the previous preview, so exactly
//! one result is current. [`Controller::commit`] packs the current preview.

use ab_glyph::Font;
use image::{DynamicImage, GrayImage, Rgba, RgbaImage};
use tracing::{debug, info, warn};

use crate::dither::dither;
use crate::grayscale::reduce;
use crate::pack::PackedBitmap;
use crate::params::{Algorithm, Parameters, TEXT_THRESHOLD};
use crate::preview::{self, EnergyFilter};
use crate::resize::{decode_image, fit_to_width};
use crate::rotate::rotate_180;
use crate::text::{TextStyle, render_text};
use crate::{DEFAULT_HEIGHT, PipelineWarning, ProcessError, Result};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Result of one conversion.
#[derive(Debug, Clone)]
pub struct Preview {
    /// Generation this preview was derived for.
    pub generation: u64,
    /// Monochrome raster, same shape as the working canvas.
    pub mono: GrayImage,
    pub warnings: Vec<PipelineWarning>,
    pub filter: EnergyFilter,
}

impl Preview {
    /// RGBA raster for on-screen display.
    pub fn to_rgba(&self) -> RgbaImage {
        preview::to_rgba(&self.mono)
    }

    /// RGBA raster with the energy filter applied.
    pub fn to_rgba_filtered(&self) -> RgbaImage {
        preview::to_rgba_filtered(&self.mono, self.filter)
    }
}

/// What the canvas currently holds.
#[derive(Debug, Clone)]
enum Content {
    Empty,
    /// A decoded image, kept so rotation can re-fit it.
    Image(DynamicImage),
    Text,
}

/// State of the conversion pipeline.
#[derive(Debug, Clone)]
pub struct Controller {
    print_width: u32,
    params: Parameters,
    canvas: RgbaImage,
    content: Content,
    generation: u64,
    preview: Option<Preview>,
}

/// Convert a canvas in one shot: reduce, dither, and build a preview.
pub fn convert(canvas: &RgbaImage, params: &Parameters, generation: u64) -> Result<Preview> {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return Err(ProcessError::DegenerateInput { width, height });
    }

    let lum = reduce(canvas, params.transparent_as_white);
    let dithered = dither(lum, params);
    Ok(Preview {
        generation,
        mono: dithered.image,
        warnings: dithered.warning.into_iter().collect(),
        filter: EnergyFilter::from_energy(params.energy),
    })
}

/// Pack a preview for the printer, applying the flip if requested.
pub fn pack_preview(preview: &Preview, params: &Parameters) -> Result<PackedBitmap> {
    if params.flip {
        PackedBitmap::pack(&rotate_180(&preview.mono))
    } else {
        PackedBitmap::pack(&preview.mono)
    }
}

impl Controller {
    /// Create a controller with an empty transparent canvas.
    pub fn new(print_width: u32, params: Parameters) -> Result<Self> {
        if print_width == 0 {
            return Err(ProcessError::DegenerateInput {
                width: 0,
                height: DEFAULT_HEIGHT,
            });
        }
        let params = params.with_target_height(DEFAULT_HEIGHT);
        Ok(Self {
            print_width,
            params,
            canvas: RgbaImage::from_pixel(print_width, DEFAULT_HEIGHT, TRANSPARENT),
            content: Content::Empty,
            generation: 0,
            preview: None,
        })
    }

    pub fn print_width(&self) -> u32 {
        self.print_width
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The current preview, if any content is loaded.
    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn has_content(&self) -> bool {
        !matches!(self.content, Content::Empty)
    }

    /// Replace the parameter snapshot and re-derive the preview.
    ///
    /// Toggling rotation re-fits a loaded image. A target height above the
    /// canvas height grows the canvas; a smaller one is ignored because the
    /// canvas is never truncated. A failed re-fit leaves the controller as it was.
    pub fn set_params(&mut self, params: Parameters) -> Result<Option<&Preview>> {
        if params.rotate != self.params.rotate {
            if let Content::Image(img) = &self.content {
                self.canvas = fit_to_width(img, self.print_width, params.rotate)?;
            }
        }
        self.params = params;

        if self.params.target_height > self.canvas.height() {
            let extra = self.params.target_height - self.canvas.height();
            self.grow(extra);
        }
        self.params.target_height = self.canvas.height();
        self.refresh()
    }

    /// Select an algorithm, resetting threshold and energy to its presets.
    pub fn use_algorithm(&mut self, algorithm: Algorithm) -> Result<Option<&Preview>> {
        let params = self.params.using_algorithm(algorithm);
        self.set_params(params)
    }

    /// Decode an encoded image and make it the working canvas.
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<&Preview> {
        let img = decode_image(bytes)?;
        self.load_decoded(img)
    }

    /// Fit an already-decoded image to the print width and convert it.
    pub fn load_decoded(&mut self, img: DynamicImage) -> Result<&Preview> {
        let canvas = fit_to_width(&img, self.print_width, self.params.rotate)?;
        info!(
            source_w = img.width(),
            source_h = img.height(),
            height = canvas.height(),
            rotate = self.params.rotate,
            "Loaded image"
        );
        self.canvas = canvas;
        self.content = Content::Image(img);
        self.params.target_height = self.canvas.height();
        self.refresh_required()
    }

    /// Render word-wrapped text as the working canvas.
    ///
    /// Switches to `direct` with the text threshold and turns rotation off.
    pub fn insert_text<F: Font>(
        &mut self,
        text: &str,
        font: &F,
        style: &TextStyle,
    ) -> Result<&Preview> {
        let canvas = render_text(text, font, style, self.print_width)?;
        info!(height = canvas.height(), "Inserted text");
        self.canvas = canvas;
        self.content = Content::Text;
        self.params = self
            .params
            .using_algorithm(Algorithm::Direct)
            .with_threshold(i64::from(TEXT_THRESHOLD))
            .with_rotate(false)
            .with_target_height(self.canvas.height());
        self.refresh_required()
    }

    /// Append `rows` transparent rows to the canvas.
    pub fn expand(&mut self, rows: u32) -> Result<Option<&Preview>> {
        self.grow(rows);
        self.params.target_height = self.canvas.height();
        self.refresh()
    }

    /// Clear the canvas back to an empty default-height sheet.
    pub fn reset(&mut self) {
        self.canvas = RgbaImage::from_pixel(self.print_width, DEFAULT_HEIGHT, TRANSPARENT);
        self.content = Content::Empty;
        self.params.target_height = DEFAULT_HEIGHT;
        self.generation += 1;
        self.preview = None;
        debug!(generation = self.generation, "Canvas reset");
    }

    /// Pack the current preview into the printer wire format.
    pub fn commit(&self) -> Result<PackedBitmap> {
        let preview = self.preview.as_ref().ok_or(ProcessError::NothingToPrint)?;
        let packed = pack_preview(preview, &self.params)?;
        info!(
            generation = preview.generation,
            width = packed.width(),
            height = packed.height(),
            "Committed bitmap"
        );
        Ok(packed)
    }

    fn grow(&mut self, rows: u32) {
        if rows == 0 {
            return;
        }
        let (width, height) = self.canvas.dimensions();
        let mut grown = RgbaImage::from_pixel(width, height + rows, TRANSPARENT);
        for (x, y, px) in self.canvas.enumerate_pixels() {
            grown.put_pixel(x, y, *px);
        }
        debug!(from = height, to = height + rows, "Expanded canvas");
        self.canvas = grown;
    }

    fn refresh(&mut self) -> Result<Option<&Preview>> {
        if !self.has_content() {
            self.generation += 1;
            self.preview = None;
            return Ok(None);
        }
        self.refresh_required().map(Some)
    }

    fn refresh_required(&mut self) -> Result<&Preview> {
        self.generation += 1;
        let preview = convert(&self.canvas, &self.params, self.generation)?;
        for warning in &preview.warnings {
            warn!(generation = self.generation, "{warning}");
        }
        debug!(generation = self.generation, "Preview updated");
        Ok(self.preview.insert(preview))
    }
}
