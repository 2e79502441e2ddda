//! Image reader implementation using the image library.
//!
//! The container format is guessed from the content, not from the file name.
//! JPEG and TIFF are the formats the writer can reproduce; other formats the
//! library understands still decode and are tagged `Unsupported`.

use std::io::Cursor;

use image::ImageFormat;
use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::decode::reader::ImageReader;
use crate::image_pipeline::decode::types::{DecodedImage, FormatTag, PixelGrid};

pub struct StandardImageReader;

fn format_tag(format: ImageFormat) -> FormatTag {
    match format {
        ImageFormat::Jpeg => FormatTag::Jpeg,
        ImageFormat::Tiff => FormatTag::Tiff,
        other => FormatTag::Unsupported(
            other
                .extensions_str()
                .first()
                .copied()
                .unwrap_or("unknown")
                .to_string(),
        ),
    }
}

impl ImageReader for StandardImageReader {
    /// Decodes `data` and expands every sample to 16 bits.
    ///
    /// Alpha is dropped; grayscale sources are replicated into R, G and B.
    fn read_image(&self, data: &[u8]) -> Result<DecodedImage> {
        debug!("Decoding image, {} bytes", data.len());

        let reader = image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ConversionError::DecodeError(e.to_string()))?;

        let format = reader
            .format()
            .map(format_tag)
            .ok_or_else(|| ConversionError::DecodeError("image: unknown format".to_string()))?;

        let decoded = reader
            .decode()
            .map_err(|e| ConversionError::DecodeError(e.to_string()))?;

        let rgb = decoded.to_rgb16();
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);
        debug!("Decoded {} image: {}x{}", format, width, height);

        let grid = PixelGrid::new(width, height, rgb.into_raw())?;
        Ok(DecodedImage { grid, format })
    }
}
