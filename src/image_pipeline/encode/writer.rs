use std::io::Write;

use crate::image_pipeline::common::config::ConversionConfig;
use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::decode::FormatTag;
use crate::image_pipeline::surface::OutputPixelGrid;

pub trait ImageWriter {
    /// Whether `write_image` can encode `format`.
    fn supports(&self, format: &FormatTag) -> bool;

    fn write_image(
        &self,
        image: &OutputPixelGrid,
        format: &FormatTag,
        output: &mut dyn Write,
        config: &ConversionConfig,
    ) -> Result<()>;
}
