//! Assembly of the corrected RGBA output grid

use tracing::instrument;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::surface::channel::Channel;
use crate::image_pipeline::surface::coefficients::Coefficients;
use crate::image_pipeline::surface::evaluator::evaluate_sample;

/// Samples per output pixel (R, G, B, A).
pub const RGBA_SAMPLES: usize = 4;

/// Alpha written for every output pixel.
pub const OPAQUE: u16 = u16::MAX;

/// Independent fitted surfaces of the three color channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelFits {
    pub red: Coefficients,
    pub green: Coefficients,
    pub blue: Coefficients,
}

impl ChannelFits {
    pub fn new(red: Coefficients, green: Coefficients, blue: Coefficients) -> Self {
        Self { red, green, blue }
    }

    pub fn get(&self, channel: Channel) -> &Coefficients {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
        }
    }
}

/// Corrected image, RGBA interleaved, 16 bits per sample, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPixelGrid {
    width: usize,
    height: usize,
    data: Vec<u16>,
}

impl OutputPixelGrid {
    pub fn new(width: usize, height: usize, data: Vec<u16>) -> Result<Self> {
        if data.len() != width * height * RGBA_SAMPLES {
            return Err(ConversionError::InvalidDimensions(width, height));
        }
        Ok(Self { width, height, data })
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

    pub fn pixel(&self, x: usize, y: usize) -> [u16; RGBA_SAMPLES] {
        let i = (y * self.width + x) * RGBA_SAMPLES;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// RGB samples reduced to 8 bits by dropping the low byte.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.data
            .chunks_exact(RGBA_SAMPLES)
            .flat_map(|p| [(p[0] >> 8) as u8, (p[1] >> 8) as u8, (p[2] >> 8) as u8])
            .collect()
    }
}

/// Evaluates every channel surface at every pixel of a `width`×`height` grid.
#[instrument(skip(fits))]
pub fn assemble(width: usize, height: usize, fits: &ChannelFits) -> OutputPixelGrid {
    let mut data = Vec::with_capacity(width * height * RGBA_SAMPLES);
    for y in 0..height {
        for x in 0..width {
            for channel in Channel::ALL {
                data.push(evaluate_sample(fits.get(channel), x, y));
            }
            data.push(OPAQUE);
        }
    }
    OutputPixelGrid { width, height, data }
}
