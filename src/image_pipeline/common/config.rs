//! Flat-field correction configuration types

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression (slow, good compression)
    Lzw,
    /// Deflate compression - fast level (good speed/size balance)
    DeflateFast,
    /// Deflate compression - best compression (slower)
    DeflateBest,
    /// Deflate compression - balanced (default)
    DeflateBalanced,
}

/// Least-squares strategy used to fit each channel surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMethod {
    /// SVD of the full (W·H)×6 design matrix.
    Svd,
    /// Streaming 6×6 normal equations, no design matrix in memory.
    NormalEquations,
}

/// Configuration for flat-field correction
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Compression method to use for TIFF output
    pub compression: TiffCompression,
    /// Predictor value for TIFF compression (2 for horizontal differencing)
    pub predictor: Option<u16>,
    /// JPEG quality, 1-100
    pub jpeg_quality: u8,
    /// How the per-channel surfaces are solved
    pub fit_method: FitMethod,
    /// Solve the three channels on the rayon pool
    pub parallel_channels: bool,
    /// Whether to validate image dimensions before fitting
    pub validate_dimensions: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            compression: TiffCompression::DeflateBalanced,
            predictor: Some(2),
            jpeg_quality: 75,
            fit_method: FitMethod::Svd,
            parallel_channels: true,
            validate_dimensions: true,
        }
    }
}

impl ConversionConfig {
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder::default()
    }
}

/// Builder for ConversionConfig
#[derive(Default)]
pub struct ConversionConfigBuilder {
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
    jpeg_quality: Option<u8>,
    fit_method: Option<FitMethod>,
    parallel_channels: Option<bool>,
    validate_dimensions: Option<bool>,
}

impl ConversionConfigBuilder {
    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    /// Clamped to 1..=100 at build time.
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = Some(quality);
        self
    }

    pub fn fit_method(mut self, method: FitMethod) -> Self {
        self.fit_method = Some(method);
        self
    }

    pub fn parallel_channels(mut self, enable: bool) -> Self {
        self.parallel_channels = Some(enable);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn build(self) -> ConversionConfig {
        let default = ConversionConfig::default();
        ConversionConfig {
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.unwrap_or(default.predictor),
            jpeg_quality: self.jpeg_quality.unwrap_or(default.jpeg_quality).clamp(1, 100),
            fit_method: self.fit_method.unwrap_or(default.fit_method),
            parallel_channels: self.parallel_channels.unwrap_or(default.parallel_channels),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
        }
    }
}
