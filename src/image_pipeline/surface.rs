//! Second-degree polynomial surface fitting
//!
//! Each color channel is modelled as
//! `f(x, y) = c0 + c1·x + c2·y + c3·x² + c4·y² + c5·x·y`
//! and fitted by ordinary least squares over every pixel. The corrected image
//! is the fitted surface itself.

pub mod assembler;
pub mod channel;
pub mod coefficients;
pub mod design_matrix;
pub mod evaluator;
pub mod normal_equations;
pub mod solver;

pub use assembler::{ChannelFits, OPAQUE, OutputPixelGrid, assemble};
pub use channel::{Channel, ChannelValues};
pub use coefficients::Coefficients;
pub use design_matrix::{BASIS_LEN, DesignMatrix, basis};
pub use evaluator::{evaluate_sample, to_sample};
pub use normal_equations::NormalEquations;
pub use solver::{LeastSquaresSolver, solve_least_squares};
