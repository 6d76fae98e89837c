//! PBM (`P4`) packing of monochrome rasters.
//!
//! Wire format handed to the print-sending backend:
//!
//! ```text
//! P4\n<width> <height>\n<rows>
//! ```
//!
//! Each row is `ceil(width / 8)` bytes, 8 pixels per byte, MSB = leftmost.
//! A set bit is a printed (black) dot and corresponds to sample 0; sample
//! 255 is blank paper. Padding bits past `width` are always zero.

use image::{GrayImage, Luma};
use tracing::debug;

use crate::{ProcessError, Result};

const MAGIC: &[u8] = b"P4";

/// A packed 1-bit bitmap plus its dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Pack a row of samples into bytes, setting a bit for every sample equal to 0.
pub fn pack_row(row: &[u8]) -> Vec<u8> {
    row.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .filter(|&(_, &px)| px == 0)
                .fold(0u8, |byte, (bit, _)| byte | (0x80 >> bit))
        })
        .collect()
}

impl PackedBitmap {
    /// Pack a monochrome raster (samples 0 or 255).
    pub fn pack(mono: &GrayImage) -> Result<Self> {
        let (width, height) = mono.dimensions();
        if width == 0 || height == 0 {
            return Err(ProcessError::DegenerateInput { width, height });
        }

        let row_bytes = width.div_ceil(8) as usize;
        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for row in mono.as_raw().chunks_exact(width as usize) {
            data.extend(pack_row(row));
        }

        debug!(width, height, bytes = data.len(), "Packed bitmap");
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per packed row.
    pub fn row_bytes(&self) -> usize {
        self.width.div_ceil(8) as usize
    }

    /// Packed rows without the header.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Textual header, `"P4\n<width> <height>\n"`.
    pub fn header(&self) -> String {
        format!("P4\n{} {}\n", self.width, self.height)
    }

    /// Header followed by the packed rows.
    pub fn to_bytes(&self) -> Vec<u8> {
        let header = self.header();
        let mut out = Vec::with_capacity(header.len() + self.data.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&self.data);
        out
    }

    /// Parse a binary PBM stream.
    ///
    /// Header tokens may be separated by any whitespace and interleaved with
    /// `#` comments. Exactly one whitespace byte separates the height from
    /// the payload. The payload length must match and row padding bits must
    /// be zero.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut cursor = HeaderCursor { bytes, pos: 0 };
        if cursor.token()? != MAGIC {
            return Err(ProcessError::InvalidBitmap("missing P4 magic".into()));
        }
        let width = cursor.number("width")?;
        let height = cursor.number("height")?;
        if width == 0 || height == 0 {
            return Err(ProcessError::DegenerateInput { width, height });
        }

        match bytes.get(cursor.pos) {
            Some(b) if b.is_ascii_whitespace() => cursor.pos += 1,
            _ => {
                return Err(ProcessError::InvalidBitmap(
                    "header must end with whitespace".into(),
                ));
            }
        }

        let payload = &bytes[cursor.pos..];
        let row_bytes = width.div_ceil(8) as usize;
        let expected = row_bytes * height as usize;
        if payload.len() != expected {
            return Err(ProcessError::InvalidBitmap(format!(
                "expected {expected} payload bytes, got {}",
                payload.len()
            )));
        }

        let pad_bits = row_bytes as u32 * 8 - width;
        if pad_bits > 0 {
            let pad_mask = (1u8 << pad_bits) - 1;
            if payload
                .chunks_exact(row_bytes)
                .any(|row| row[row_bytes - 1] & pad_mask != 0)
            {
                return Err(ProcessError::InvalidBitmap("row padding bits are set".into()));
            }
        }

        Ok(Self {
            width,
            height,
            data: payload.to_vec(),
        })
    }

    /// Unpack into a monochrome raster: set bits become 0, clear bits 255.
    pub fn to_mono(&self) -> GrayImage {
        let row_bytes = self.row_bytes();
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let byte = self.data[y as usize * row_bytes + (x / 8) as usize];
            let printed = byte & (0x80 >> (x % 8)) != 0;
            Luma([if printed { 0 } else { 255 }])
        })
    }
}

/// Tokenizer over the ASCII header of a PBM stream.
struct HeaderCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> HeaderCursor<'a> {
    fn skip_separators(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == b'#' {
                while self.bytes.get(self.pos).is_some_and(|&c| c != b'\n') {
                    self.pos += 1;
                }
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn token(&mut self) -> Result<&'a [u8]> {
        self.skip_separators();
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| !b.is_ascii_whitespace() && *b != b'#')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(ProcessError::InvalidBitmap("truncated header".into()));
        }
        Ok(&self.bytes[start..self.pos])
    }

    fn number(&mut self, what: &str) -> Result<u32> {
        let token = self.token()?;
        std::str::from_utf8(token)
            .ok()
            .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ProcessError::InvalidBitmap(format!("invalid {what}")))
    }
}
