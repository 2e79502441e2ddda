//! Common utilities module
//!
//! This module contains the error type, configuration and timing helpers
//! shared across the image pipeline.

pub mod config;
pub mod error;
pub mod timing;

pub use config::{ConversionConfig, ConversionConfigBuilder, FitMethod, TiffCompression};
pub use error::{ConversionError, Result};
pub use timing::{PipelineTimings, StepTiming, Timer};
