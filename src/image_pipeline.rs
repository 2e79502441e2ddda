//! Image processing pipeline module
//!
//! Flat-field correction by polynomial surface fitting, split into decoding,
//! surface fitting, encoding and the orchestration that ties them together.

pub mod common;
pub mod conversions;
pub mod decode;
pub mod encode;
pub mod surface;

pub use common::{
    ConversionConfig,
    ConversionConfigBuilder,
    ConversionError,
    FitMethod,
    PipelineTimings,
    Result,
    TiffCompression,
};

pub use decode::{
    DecodedImage,
    FormatTag,
    ImageReader,
    PixelGrid,
    StandardImageReader,
};

pub use encode::{
    ImageWriter,
    StandardImageWriter,
};

pub use surface::{
    Channel,
    ChannelFits,
    Coefficients,
    DesignMatrix,
    LeastSquaresSolver,
    OutputPixelGrid,
};

pub use conversions::{
    FlatFieldPipeline,
};
