//! Image encoding module
//!
//! Encodes the corrected grid back into the container format of the input.

mod standard_writer;
mod writer;

pub use standard_writer::StandardImageWriter;
pub use writer::ImageWriter;
