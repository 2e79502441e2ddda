//! Image decoding module
//!
//! Turns encoded image bytes into a 16-bit RGB [`PixelGrid`] plus the
//! [`FormatTag`] the writer later dispatches on.

mod reader;
mod standard_reader;
pub mod types;

pub use reader::ImageReader;
pub use standard_reader::StandardImageReader;
pub use types::{DecodedImage, FormatTag, PixelGrid};
