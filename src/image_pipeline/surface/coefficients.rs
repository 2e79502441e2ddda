use crate::image_pipeline::surface::channel::ChannelValues;
use crate::image_pipeline::surface::design_matrix::{BASIS_LEN, basis};

/// Least-squares coefficients of one channel surface, in pixel coordinates,
/// ordered like the design matrix columns `[1, x, y, x², y², x·y]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients([f64; BASIS_LEN]);

impl Coefficients {
    pub fn new(values: [f64; BASIS_LEN]) -> Self {
        Self(values)
    }

    /// Undoes column equilibration: a solution found for columns divided by
    /// `scales` is divided by the same factors to apply to raw coordinates.
    pub(crate) fn from_scaled(scaled: &[f64], scales: &[f64; BASIS_LEN]) -> Self {
        let mut values = [0.0; BASIS_LEN];
        for (k, value) in values.iter_mut().enumerate() {
            *value = scaled[k] / scales[k];
        }
        Self(values)
    }

    pub fn as_array(&self) -> &[f64; BASIS_LEN] {
        &self.0
    }

    /// f(x, y) = c0 + c1·x + c2·y + c3·x² + c4·y² + c5·x·y
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        basis(x, y)
            .iter()
            .zip(self.0.iter())
            .map(|(b, c)| b * c)
            .sum()
    }

    /// Root-mean-square difference between the surface and the samples it was
    /// fitted to.
    pub fn rms_residual(&self, width: usize, values: &ChannelValues) -> f64 {
        if values.is_empty() || width == 0 {
            return 0.0;
        }
        let sum_sq: f64 = values
            .as_vector()
            .iter()
            .enumerate()
            .map(|(k, &v)| {
                let r = self.evaluate((k % width) as f64, (k / width) as f64) - v;
                r * r
            })
            .sum();
        (sum_sq / values.len() as f64).sqrt()
    }
}
