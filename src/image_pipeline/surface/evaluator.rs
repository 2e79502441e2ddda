//! Conversion of fitted surface values into output samples

use crate::image_pipeline::surface::coefficients::Coefficients;

/// Rounds a fitted value into a 16-bit output sample.
///
/// Negative values floor at 0. There is no explicit ceiling: values above
/// `u16::MAX` saturate through the float-to-integer cast, and NaN becomes 0.
#[inline]
pub fn to_sample(value: f64) -> u16 {
    value.max(0.0).round() as u16
}

/// Corrected sample for pixel (x, y). The fitted surface value replaces the
/// original sample outright.
#[inline]
pub fn evaluate_sample(coefficients: &Coefficients, x: usize, y: usize) -> u16 {
    to_sample(coefficients.evaluate(x as f64, y as f64))
}
