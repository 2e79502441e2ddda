//! Decoded image types

use std::fmt;

use crate::image_pipeline::common::error::{ConversionError, Result};

/// Number of interleaved samples per input pixel (R, G, B).
pub const RGB_SAMPLES: usize = 3;

/// Container format an image was decoded from.
///
/// Only `Jpeg` and `Tiff` have encoders; anything else the decoder recognised
/// is carried as `Unsupported` so that the writer can refuse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatTag {
    Jpeg,
    Tiff,
    Unsupported(String),
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatTag::Jpeg => f.write_str("jpeg"),
            FormatTag::Tiff => f.write_str("tiff"),
            FormatTag::Unsupported(name) => f.write_str(name),
        }
    }
}

/// Immutable RGB pixel grid.
///
/// Samples are interleaved `[R, G, B, R, G, B, ...]` in row-major order and
/// always span the full 16-bit range: 8-bit sources are expanded by 257 so
/// that 0xFF becomes 0xFFFF.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    data: Vec<u16>,
}

impl PixelGrid {
    pub fn new(width: usize, height: usize, data: Vec<u16>) -> Result<Self> {
        if data.len() != width * height * RGB_SAMPLES {
            return Err(ConversionError::InvalidDimensions(width, height));
        }
        Ok(Self { width, height, data })
    }

    /// Builds a grid by evaluating `f` at every (x, y).
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> [u16; 3]) -> Self {
        let mut data = Vec::with_capacity(width * height * RGB_SAMPLES);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u16] {
        &self.data
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u16; 3] {
        let i = (y * self.width + x) * RGB_SAMPLES;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Pixels in row-major scan order (y outer, x inner).
    pub fn pixels(&self) -> impl Iterator<Item = [u16; 3]> + '_ {
        self.data
            .chunks_exact(RGB_SAMPLES)
            .map(|p| [p[0], p[1], p[2]])
    }
}

/// Output of an [`ImageReader`](super::ImageReader).
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub grid: PixelGrid,
    pub format: FormatTag,
}
