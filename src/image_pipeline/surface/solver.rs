//! Least-squares solve of one channel surface
//!
//! The design matrix columns span wildly different magnitudes on large images
//! (1 against (W−1)²), so every column is divided by its largest value before
//! the SVD and the coefficients are rescaled afterwards. The minimiser of
//! ‖Ax − b‖² is unchanged.

use std::fmt;

use nalgebra::{Dyn, SVD};
use tracing::{debug, instrument};

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::surface::channel::ChannelValues;
use crate::image_pipeline::surface::coefficients::Coefficients;
use crate::image_pipeline::surface::design_matrix::{BASIS_LEN, DesignMatrix};

/// Smallest accepted ratio between the smallest and largest singular value of
/// the column-scaled design matrix.
pub const RANK_TOLERANCE: f64 = 1e-10;

/// Label used when a failure belongs to the shared decomposition rather than
/// to one channel.
const EVERY_CHANNEL: &str = "every";

pub(crate) fn singular(channel: impl fmt::Display, reason: impl Into<String>) -> ConversionError {
    ConversionError::SingularSystem {
        channel: channel.to_string(),
        reason: reason.into(),
    }
}

/// Rejects systems that cannot have full column rank before any
/// decomposition runs.
pub(crate) fn check_shape(
    channel: impl fmt::Display,
    samples: usize,
    scales: &[f64; BASIS_LEN],
) -> Result<()> {
    if samples < BASIS_LEN {
        return Err(singular(
            channel,
            format!("{} samples for {} unknowns", samples, BASIS_LEN),
        ));
    }
    if let Some(col) = scales.iter().position(|&s| s == 0.0) {
        return Err(singular(channel, format!("basis column {} is identically zero", col)));
    }
    Ok(())
}

/// Fails when the spread of `singular_values` exceeds `tolerance`.
pub(crate) fn check_rank(
    channel: impl fmt::Display,
    singular_values: &[f64],
    tolerance: f64,
) -> Result<()> {
    let max = singular_values.iter().cloned().fold(0.0, f64::max);
    let min = singular_values.iter().cloned().fold(f64::INFINITY, f64::min);
    if !(max > 0.0) || !(min > max * tolerance) {
        return Err(singular(
            channel,
            format!("rank deficient (singular values {:e}..{:e})", min, max),
        ));
    }
    debug!(channel = %channel, condition = max / min, "Design matrix conditioning");
    Ok(())
}

/// SVD of the column-scaled design matrix, computed once per image.
///
/// The decomposition only depends on the grid dimensions, so one instance
/// serves all three channels and may be shared across threads.
pub struct LeastSquaresSolver {
    width: usize,
    height: usize,
    scales: [f64; BASIS_LEN],
    svd: SVD<f64, Dyn, Dyn>,
}

impl LeastSquaresSolver {
    /// Scales the columns of `design` in place and factors it. Rank checks
    /// run here, so a singular grid fails before any channel is solved.
    #[instrument(skip_all, fields(rows = design.rows()))]
    pub fn new(design: DesignMatrix) -> Result<Self> {
        let (width, height) = (design.width(), design.height());
        let scales = design.column_scales();
        check_shape(EVERY_CHANNEL, design.rows(), &scales)?;

        let mut scaled = design.into_matrix();
        for (col, scale) in scales.iter().enumerate() {
            scaled.column_mut(col).scale_mut(1.0 / scale);
        }

        let svd = scaled.svd(true, true);
        check_rank(EVERY_CHANNEL, svd.singular_values.as_slice(), RANK_TOLERANCE)?;

        Ok(Self { width, height, scales, svd })
    }

    pub fn rows(&self) -> usize {
        self.width * self.height
    }

    /// Ordinary least-squares coefficients for one channel.
    #[instrument(skip_all, fields(channel = %values.channel()))]
    pub fn solve(&self, values: &ChannelValues) -> Result<Coefficients> {
        if values.len() != self.rows() {
            return Err(ConversionError::InvalidDimensions(self.width, self.height));
        }

        let solution = self
            .svd
            .solve(values.as_vector(), 0.0)
            .map_err(|e| singular(values.channel(), e))?;

        Ok(Coefficients::from_scaled(solution.as_slice(), &self.scales))
    }
}

/// One-off fit of a single channel. Fitting several channels of the same
/// image should go through one [`LeastSquaresSolver`] instead.
pub fn solve_least_squares(design: &DesignMatrix, values: &ChannelValues) -> Result<Coefficients> {
    if values.len() != design.rows() {
        return Err(ConversionError::InvalidDimensions(design.width(), design.height()));
    }
    LeastSquaresSolver::new(design.clone())?.solve(values)
}
