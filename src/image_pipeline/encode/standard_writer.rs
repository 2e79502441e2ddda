use std::io::{Cursor, Write};

use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use tiff::encoder::compression::DeflateLevel;
use tracing::debug;

use crate::image_pipeline::common::config::{ConversionConfig, TiffCompression};
use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::decode::FormatTag;
use crate::image_pipeline::encode::writer::ImageWriter;
use crate::image_pipeline::surface::OutputPixelGrid;

/// Writes JPEG through the image library and 16-bit RGBA TIFF through the
/// tiff library. Both encode into memory first, so `output` only receives
/// complete files.
pub struct StandardImageWriter;

fn encode_error(format: &FormatTag, e: impl ToString) -> ConversionError {
    ConversionError::EncodeError {
        format: format.to_string(),
        message: e.to_string(),
    }
}

fn dimensions(image: &OutputPixelGrid) -> Result<(u32, u32)> {
    match (u32::try_from(image.width()), u32::try_from(image.height())) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(ConversionError::InvalidDimensions(image.width(), image.height())),
    }
}

impl StandardImageWriter {
    fn write_tiff(&self, image: &OutputPixelGrid, output: &mut dyn Write, config: &ConversionConfig) -> Result<()> {
        debug!("Encoding TIFF image: {}x{}", image.width(), image.height());
        let (width, height) = dimensions(image)?;

        let mut buffer = Vec::new();

        let compression = match config.compression {
            TiffCompression::None => tiff::encoder::Compression::Uncompressed,
            TiffCompression::Lzw => tiff::encoder::Compression::Lzw,
            TiffCompression::DeflateFast => tiff::encoder::Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => tiff::encoder::Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => tiff::encoder::Compression::Deflate(DeflateLevel::Best),
        };

        let mut encoder = tiff::encoder::TiffEncoder::new(Cursor::new(&mut buffer))
            .map_err(|e| encode_error(&FormatTag::Tiff, e))?
            .with_compression(compression);

        if let Some(predictor_val) = config.predictor {
            let predictor = match predictor_val {
                2 => tiff::tags::Predictor::Horizontal,
                _ => tiff::tags::Predictor::None,
            };
            encoder = encoder.with_predictor(predictor);
        }

        encoder
            .write_image::<tiff::encoder::colortype::RGBA16>(width, height, image.data())
            .map_err(|e| encode_error(&FormatTag::Tiff, e))?;

        output.write_all(&buffer)?;

        debug!("TIFF encoding complete, {} bytes", buffer.len());
        Ok(())
    }

    /// JPEG carries 8-bit RGB only; alpha is dropped and samples lose their
    /// low byte.
    fn write_jpeg(&self, image: &OutputPixelGrid, output: &mut dyn Write, config: &ConversionConfig) -> Result<()> {
        debug!(
            "Encoding JPEG image: {}x{}, quality {}",
            image.width(), image.height(), config.jpeg_quality
        );
        let (width, height) = dimensions(image)?;

        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, config.jpeg_quality)
            .encode(&image.to_rgb8(), width, height, ExtendedColorType::Rgb8)
            .map_err(|e| encode_error(&FormatTag::Jpeg, e))?;

        output.write_all(&buffer)?;

        debug!("JPEG encoding complete, {} bytes", buffer.len());
        Ok(())
    }
}

impl ImageWriter for StandardImageWriter {
    fn supports(&self, format: &FormatTag) -> bool {
        matches!(format, FormatTag::Jpeg | FormatTag::Tiff)
    }

    fn write_image(
        &self,
        image: &OutputPixelGrid,
        format: &FormatTag,
        output: &mut dyn Write,
        config: &ConversionConfig,
    ) -> Result<()> {
        match format {
            FormatTag::Jpeg => self.write_jpeg(image, output, config),
            FormatTag::Tiff => self.write_tiff(image, output, config),
            FormatTag::Unsupported(name) => Err(ConversionError::UnknownFormat(name.clone())),
        }
    }
}
