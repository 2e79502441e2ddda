//! Design matrix for the second-degree surface model
//!
//! Column order is fixed: `[1, x, y, x², y², x·y]`. The solver, the streaming
//! normal equations and the evaluator all rely on this positional order.

use nalgebra::DMatrix;

use crate::image_pipeline::common::error::{ConversionError, Result};

/// Number of basis functions (and coefficients) per channel.
pub const BASIS_LEN: usize = 6;

/// Evaluates the basis functions at (x, y).
#[inline]
pub fn basis(x: f64, y: f64) -> [f64; BASIS_LEN] {
    [1.0, x, y, x * x, y * y, x * y]
}

/// Largest absolute value of each basis column over a `width`×`height` grid.
///
/// Coordinates run from 0 to W−1 and H−1, so a single-pixel extent yields a
/// zero scale for every column that depends on that coordinate.
pub fn column_scales(width: usize, height: usize) -> [f64; BASIS_LEN] {
    let sx = width.saturating_sub(1) as f64;
    let sy = height.saturating_sub(1) as f64;
    [1.0, sx, sy, sx * sx, sy * sy, sx * sy]
}

/// (W·H)×6 regression matrix; row `y·W + x` holds `basis(x, y)`.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    width: usize,
    height: usize,
    matrix: DMatrix<f64>,
}

impl DesignMatrix {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ConversionError::InvalidDimensions(width, height));
        }

        let rows = width * height;
        let mut matrix = DMatrix::<f64>::zeros(rows, BASIS_LEN);
        for y in 0..height {
            for x in 0..width {
                let row = y * width + x;
                for (col, value) in basis(x as f64, y as f64).into_iter().enumerate() {
                    matrix[(row, col)] = value;
                }
            }
        }

        Ok(Self { width, height, matrix })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn rows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn into_matrix(self) -> DMatrix<f64> {
        self.matrix
    }

    pub fn column_scales(&self) -> [f64; BASIS_LEN] {
        column_scales(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_and_entries() {
        for (width, height) in [(3, 3), (4, 5), (7, 3)] {
            let design = DesignMatrix::new(width, height).unwrap();
            let m = design.as_matrix();
            assert_eq!(design.rows(), width * height);
            assert_eq!(m.ncols(), BASIS_LEN);

            for y in 0..height {
                for x in 0..width {
                    let row = y * width + x;
                    let (xf, yf) = (x as f64, y as f64);
                    assert_eq!(m[(row, 0)], 1.0);
                    assert_eq!(m[(row, 1)], xf);
                    assert_eq!(m[(row, 2)], yf);
                    assert_eq!(m[(row, 3)], xf * xf);
                    assert_eq!(m[(row, 4)], yf * yf);
                    assert_eq!(m[(row, 5)], xf * yf);
                }
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let a = DesignMatrix::new(5, 4).unwrap();
        let b = DesignMatrix::new(5, 4).unwrap();
        assert_eq!(a.as_matrix(), b.as_matrix());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            DesignMatrix::new(0, 4),
            Err(ConversionError::InvalidDimensions(0, 4))
        ));
    }

    #[test]
    fn test_column_scales_match_column_maxima() {
        let design = DesignMatrix::new(6, 4).unwrap();
        let scales = design.column_scales();
        for (col, scale) in scales.iter().enumerate() {
            assert_eq!(design.as_matrix().column(col).amax(), *scale);
        }
        assert_eq!(column_scales(1, 9)[1], 0.0);
    }
}
