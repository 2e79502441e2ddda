//! Color channels and their per-channel value vectors

use std::fmt;

use nalgebra::DVector;

use crate::image_pipeline::decode::PixelGrid;

/// One of the three fitted color channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    /// Position of this channel in an interleaved RGB(A) sample.
    pub fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }

    pub fn extract(self, pixel: [u16; 3]) -> u16 {
        pixel[self.index()]
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        })
    }
}

/// One channel's intensities in row-major scan order, matching the row order
/// of [`DesignMatrix`](super::DesignMatrix).
#[derive(Debug, Clone)]
pub struct ChannelValues {
    channel: Channel,
    values: DVector<f64>,
}

impl ChannelValues {
    pub fn from_grid(grid: &PixelGrid, channel: Channel) -> Self {
        let values = DVector::from_iterator(
            grid.width() * grid.height(),
            grid.pixels().map(|p| channel.extract(p) as f64),
        );
        Self { channel, values }
    }

    pub fn from_vec(channel: Channel, values: Vec<f64>) -> Self {
        Self {
            channel,
            values: DVector::from_vec(values),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_vector(&self) -> &DVector<f64> {
        &self.values
    }
}
