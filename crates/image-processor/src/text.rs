//! Text rendering for thermal printer images.
//!
//! Text is word-wrapped against a pixel width using real font metrics and
//! drawn black on a white canvas of the print width.

use std::fmt;
use std::str::FromStr;

use ab_glyph::{Font, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use tracing::debug;

use crate::{ProcessError, Result};

/// Default font size in pixels.
pub const DEFAULT_FONT_SIZE: u32 = 20;

/// Horizontal space kept free at the right edge of the canvas.
pub const RIGHT_MARGIN: u32 = 10;

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Horizontal placement of each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    /// X offset of a line of `line_width` inside `max_width`.
    pub fn offset(self, max_width: f32, line_width: f32) -> f32 {
        let slack = (max_width - line_width).max(0.0);
        match self {
            Align::Left => 0.0,
            Align::Center => slack / 2.0,
            Align::Right => slack,
        }
    }
}

impl fmt::Display for Align {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
        })
    }
}

impl FromStr for Align {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Align::Left),
            "center" => Ok(Align::Center),
            "right" => Ok(Align::Right),
            other => Err(format!("unknown alignment '{other}'")),
        }
    }
}

/// Text style chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub font_size: u32,
    pub align: Align,
    pub wrap_by_spaces: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            align: Align::Left,
            wrap_by_spaces: true,
        }
    }
}

/// Rendered width of a string.
pub trait TextMeasure {
    fn measure(&self, text: &str) -> f32;
}

/// [`TextMeasure`] backed by a real font at a fixed pixel size.
pub struct GlyphMeasure<'a, F> {
    font: &'a F,
    scale: PxScale,
}

impl<'a, F: Font> GlyphMeasure<'a, F> {
    pub fn new(font: &'a F, font_size: u32) -> Self {
        Self {
            font,
            scale: PxScale::from(font_size as f32),
        }
    }
}

impl<F: Font> TextMeasure for GlyphMeasure<'_, F> {
    fn measure(&self, text: &str) -> f32 {
        let scaled = self.font.as_scaled(self.scale);
        let mut width = 0.0f32;
        let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

        for ch in text.chars() {
            let glyph_id = scaled.glyph_id(ch);
            if let Some(prev) = prev_glyph {
                width += scaled.kern(prev, glyph_id);
            }
            width += scaled.h_advance(glyph_id);
            prev_glyph = Some(glyph_id);
        }

        width
    }
}

/// Split text into lines no wider than `max_width`.
///
/// While the remaining text overflows, the number of characters that fit is
/// estimated as `floor(max_width / width * len)`. An estimate of zero
/// consumes exactly one character. Otherwise a newline inside the estimated
/// window breaks there; failing that, with `wrap_by_spaces` the line backs
/// off to the last space at or before the estimate (the space is dropped),
/// or splits hard at the estimate. Once the rest fits it is split on
/// newlines. Every iteration consumes at least one character.
pub fn layout(
    measure: &impl TextMeasure,
    text: &str,
    wrap_by_spaces: bool,
    max_width: f32,
) -> Vec<String> {
    let mut rest: Vec<char> = text.chars().collect();
    let mut lines = Vec::new();

    while !rest.is_empty() {
        let remaining: String = rest.iter().collect();
        let width = measure.measure(&remaining);
        if width <= max_width {
            break;
        }

        let estimate = f64::from(max_width) * rest.len() as f64 / f64::from(width);
        let max_chars = (estimate.floor().max(0.0) as usize).min(rest.len());
        if max_chars == 0 {
            lines.push(rest[..1].iter().collect());
            rest.drain(..1);
            continue;
        }

        let (line_end, resume) = split_point(&rest, max_chars, wrap_by_spaces);
        lines.push(rest[..line_end].iter().collect());
        rest.drain(..resume);
    }

    if rest.is_empty() && !lines.is_empty() {
        return lines;
    }
    let tail: String = rest.into_iter().collect();
    lines.extend(tail.split('\n').map(str::to_string));
    lines
}

/// End of the emitted line and the index the next line starts from.
fn split_point(chars: &[char], max_chars: usize, wrap_by_spaces: bool) -> (usize, usize) {
    if let Some(nl) = chars[..max_chars].iter().position(|&c| c == '\n') {
        return (nl, nl + 1);
    }
    if wrap_by_spaces {
        let window = &chars[..=max_chars.min(chars.len() - 1)];
        if let Some(space) = window.iter().rposition(|&c| c == ' ') {
            if space > 0 {
                return (space, space + 1);
            }
        }
    }
    (max_chars, max_chars)
}

/// Canvas height for a number of lines: `lines * size + size / 2`.
pub fn text_height(line_count: usize, font_size: u32) -> u32 {
    line_count as u32 * font_size + font_size / 2
}

/// Render text onto a new white canvas exactly `print_width` pixels wide.
///
/// Baseline of line `k` sits at `(k + 1) * font_size`. Whitespace-only text
/// is rejected.
pub fn render_text<F: Font>(
    text: &str,
    font: &F,
    style: &TextStyle,
    print_width: u32,
) -> Result<RgbaImage> {
    if text.trim().is_empty() {
        return Err(ProcessError::EmptyText);
    }
    if style.font_size == 0 {
        return Err(ProcessError::Font("font size must be positive".into()));
    }

    let measure = GlyphMeasure::new(font, style.font_size);
    let max_width = print_width.saturating_sub(RIGHT_MARGIN) as f32;
    let lines = layout(&measure, text, style.wrap_by_spaces, max_width);

    let height = text_height(lines.len(), style.font_size);
    debug!(
        lines = lines.len(),
        font_size = style.font_size,
        height,
        "Rendering text"
    );

    let mut img = RgbaImage::from_pixel(print_width, height, WHITE);
    let scale = PxScale::from(style.font_size as f32);
    let ascent = font.as_scaled(scale).ascent();
    for (k, line) in lines.iter().enumerate() {
        let x = style.align.offset(max_width, measure.measure(line));
        let baseline = ((k as u32 + 1) * style.font_size) as f32;
        let top = (baseline - ascent).round() as i32;
        draw_text_mut(&mut img, BLACK, x.round() as i32, top, scale, font, line);
    }
    Ok(img)
}

/// DejaVu Sans Mono, used by rendering tests.
#[cfg(test)]
pub(crate) const TEST_FONT: &[u8] = include_bytes!("../testdata/DejaVuSansMono.ttf");

#[cfg(test)]
mod tests {
    use super::*;
    use ab_glyph::FontRef;

    fn font() -> FontRef<'static> {
        FontRef::try_from_slice(TEST_FONT).unwrap()
    }

    fn style(align: Align) -> TextStyle {
        TextStyle {
            align,
            ..TextStyle::default()
        }
    }

    /// Leftmost and rightmost columns holding dark pixels.
    fn ink_columns(img: &RgbaImage) -> Option<(u32, u32)> {
        let dark: Vec<u32> = img
            .enumerate_pixels()
            .filter(|(_, _, px)| px.0[0] < 128)
            .map(|(x, _, _)| x)
            .collect();
        Some((*dark.iter().min()?, *dark.iter().max()?))
    }

    /// Every character is `advance` pixels wide.
    struct Monospace {
        advance: f32,
    }

    impl TextMeasure for Monospace {
        fn measure(&self, text: &str) -> f32 {
            text.chars().count() as f32 * self.advance
        }
    }

    const MONO10: Monospace = Monospace { advance: 10.0 };

    #[test]
    fn test_short_text_is_one_line() {
        assert_eq!(layout(&MONO10, "hello", true, 100.0), vec!["hello"]);
    }

    #[test]
    fn test_explicit_newlines_split_fitting_text() {
        assert_eq!(layout(&MONO10, "ab\ncd", true, 100.0), vec!["ab", "cd"]);
    }

    #[test]
    fn test_wrap_by_spaces_backs_off_to_space() {
        // 8 characters fit per line
        let lines = layout(&MONO10, "hello world again", true, 80.0);
        assert_eq!(lines, vec!["hello", "world", "again"]);
    }

    #[test]
    fn test_hard_wrap_without_spaces_option() {
        let lines = layout(&MONO10, "hello world again", false, 80.0);
        assert_eq!(lines, vec!["hello wo", "rld agai", "n"]);
    }

    #[test]
    fn test_space_fallback_to_hard_split() {
        let lines = layout(&MONO10, "abcdefghijkl", true, 50.0);
        assert_eq!(lines, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn test_newline_in_window_takes_priority() {
        let lines = layout(&MONO10, "ab\ncdefghijklmn", true, 80.0);
        assert_eq!(lines, vec!["ab", "cdefghij", "klmn"]);
    }

    #[test]
    fn test_zero_estimate_forces_single_character() {
        // A single glyph wider than the line
        let wide = Monospace { advance: 50.0 };
        let lines = layout(&wide, "abc", true, 20.0);
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_layout_terminates_within_text_length() {
        struct Counting<'a> {
            calls: &'a std::cell::Cell<usize>,
        }
        impl TextMeasure for Counting<'_> {
            fn measure(&self, text: &str) -> f32 {
                self.calls.set(self.calls.get() + 1);
                text.chars().count() as f32 * 1000.0
            }
        }

        let calls = std::cell::Cell::new(0);
        let text = "pathological glyphs everywhere";
        let lines = layout(&Counting { calls: &calls }, text, true, 1.0);
        assert_eq!(lines.len(), text.chars().count());
        assert!(calls.get() <= text.chars().count() + 1);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let text = "The quick brown fox\njumps over the lazy dog, twice over.";
        let first = layout(&MONO10, text, true, 120.0);
        for _ in 0..5 {
            assert_eq!(layout(&MONO10, text, true, 120.0), first);
        }
    }

    #[test]
    fn test_multibyte_characters_split_on_char_boundaries() {
        let lines = layout(&MONO10, "ああああああ", false, 30.0);
        assert_eq!(lines, vec!["あああ", "あああ"]);
    }

    #[test]
    fn test_text_height() {
        assert_eq!(text_height(3, 20), 70);
        assert_eq!(text_height(1, 15), 22);
    }

    #[test]
    fn test_align_offsets() {
        assert_eq!(Align::Left.offset(100.0, 40.0), 0.0);
        assert_eq!(Align::Center.offset(100.0, 40.0), 30.0);
        assert_eq!(Align::Right.offset(100.0, 40.0), 60.0);
        assert_eq!(Align::Right.offset(100.0, 140.0), 0.0);
    }

    #[test]
    fn test_render_canvas_shape() {
        let font = font();
        let img = render_text("ab\ncd\nef", &font, &TextStyle::default(), 200).unwrap();
        assert_eq!(img.dimensions(), (200, text_height(3, 20)));

        let big = TextStyle {
            font_size: 31,
            ..TextStyle::default()
        };
        let img = render_text("x", &font, &big, 384).unwrap();
        assert_eq!(img.dimensions(), (384, 31 + 15));
        // Opaque white background around black ink
        assert_eq!(img.get_pixel(383, 0).0, [255, 255, 255, 255]);
        assert!(ink_columns(&img).is_some());
    }

    #[test]
    fn test_render_wraps_long_text_to_width() {
        let font = font();
        let text = "one two three four five six seven eight nine ten";
        let img = render_text(text, &font, &TextStyle::default(), 120).unwrap();
        assert!(img.height() > text_height(1, 20));
        let (_, right) = ink_columns(&img).unwrap();
        assert!(right < 120 - RIGHT_MARGIN);
    }

    #[test]
    fn test_render_rejects_blank_text() {
        let font = font();
        for text in ["", "   ", "\n\n", " \t\n "] {
            assert!(matches!(
                render_text(text, &font, &TextStyle::default(), 200),
                Err(ProcessError::EmptyText)
            ));
        }
    }

    #[test]
    fn test_render_rejects_zero_size() {
        let font = font();
        let zero = TextStyle {
            font_size: 0,
            ..TextStyle::default()
        };
        assert!(matches!(
            render_text("hi", &font, &zero, 200),
            Err(ProcessError::Font(_))
        ));
    }

    #[test]
    fn test_alignment_moves_ink() {
        let font = font();
        let (left, _) = ink_columns(&render_text("ab", &font, &style(Align::Left), 200).unwrap())
            .unwrap();
        let (center, _) =
            ink_columns(&render_text("ab", &font, &style(Align::Center), 200).unwrap()).unwrap();
        let (right, right_end) =
            ink_columns(&render_text("ab", &font, &style(Align::Right), 200).unwrap()).unwrap();

        assert!(left < 10);
        assert!(left < center && center < right);
        // Right-aligned ink stops at the margin
        assert!(right_end < 200 - RIGHT_MARGIN + 2);
        assert!(right_end > 200 - RIGHT_MARGIN - 10);
    }

    #[test]
    fn test_align_parse() {
        assert_eq!("Center".parse::<Align>(), Ok(Align::Center));
        assert!("justify".parse::<Align>().is_err());
    }
}
