//! Streaming least squares via the normal equations
//!
//! Accumulates AᵀA (6×6) and Aᵀb (6) one pixel at a time so the (W·H)×6
//! design matrix never exists in memory. Coordinates are scaled to [0, 1]
//! while accumulating to keep AᵀA well conditioned.

use nalgebra::{Matrix6, Vector6};
use tracing::instrument;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::decode::PixelGrid;
use crate::image_pipeline::surface::channel::{Channel, ChannelValues};
use crate::image_pipeline::surface::coefficients::Coefficients;
use crate::image_pipeline::surface::design_matrix::{BASIS_LEN, basis, column_scales};
use crate::image_pipeline::surface::solver::{check_rank, check_shape, singular};

/// Singular values of AᵀA are the squares of those of A, hence the square of
/// the SVD path's tolerance.
pub const GRAM_RANK_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct NormalEquations {
    channel: Channel,
    width: usize,
    height: usize,
    scales: [f64; BASIS_LEN],
    inv_x: f64,
    inv_y: f64,
    gram: Matrix6<f64>,
    rhs: Vector6<f64>,
    samples: usize,
}

impl NormalEquations {
    pub fn new(channel: Channel, width: usize, height: usize) -> Self {
        let scales = column_scales(width, height);
        let inverse = |s: f64| if s > 0.0 { 1.0 / s } else { 0.0 };
        Self {
            channel,
            width,
            height,
            inv_x: inverse(scales[1]),
            inv_y: inverse(scales[2]),
            scales,
            gram: Matrix6::zeros(),
            rhs: Vector6::zeros(),
            samples: 0,
        }
    }

    pub fn from_grid(grid: &PixelGrid, channel: Channel) -> Self {
        let mut equations = Self::new(channel, grid.width(), grid.height());
        for (k, pixel) in grid.pixels().enumerate() {
            equations.accumulate(k % grid.width(), k / grid.width(), channel.extract(pixel) as f64);
        }
        equations
    }

    pub fn from_values(width: usize, height: usize, values: &ChannelValues) -> Result<Self> {
        if width == 0 || values.len() != width * height {
            return Err(ConversionError::InvalidDimensions(width, height));
        }
        let mut equations = Self::new(values.channel(), width, height);
        for (k, &value) in values.as_vector().iter().enumerate() {
            equations.accumulate(k % width, k / width, value);
        }
        Ok(equations)
    }

    /// Adds the sample at pixel (x, y). Only the upper triangle of AᵀA is
    /// accumulated.
    pub fn accumulate(&mut self, x: usize, y: usize, value: f64) {
        let row = basis(x as f64 * self.inv_x, y as f64 * self.inv_y);
        for i in 0..BASIS_LEN {
            self.rhs[i] += row[i] * value;
            for j in i..BASIS_LEN {
                self.gram[(i, j)] += row[i] * row[j];
            }
        }
        self.samples += 1;
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    #[instrument(skip_all, fields(channel = %self.channel, samples = self.samples))]
    pub fn solve(&self) -> Result<Coefficients> {
        check_shape(self.channel, self.samples, &self.scales)?;
        if self.samples != self.width * self.height {
            return Err(ConversionError::InvalidDimensions(self.width, self.height));
        }

        let mut gram = self.gram;
        for i in 0..BASIS_LEN {
            for j in 0..i {
                gram[(i, j)] = gram[(j, i)];
            }
        }

        let svd = gram.svd(true, true);
        check_rank(self.channel, svd.singular_values.as_slice(), GRAM_RANK_TOLERANCE)?;

        let solution = svd
            .solve(&self.rhs, 0.0)
            .map_err(|e| singular(self.channel, e))?;

        Ok(Coefficients::from_scaled(solution.as_slice(), &self.scales))
    }
}
