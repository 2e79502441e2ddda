use std::io::Write;
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::image_pipeline::{
    common::{
        config::{ConversionConfig, FitMethod},
        error::{ConversionError, Result},
        timing::PipelineTimings,
    },
    decode::{FormatTag, ImageReader, PixelGrid, StandardImageReader},
    encode::{ImageWriter, StandardImageWriter},
    surface::{
        Channel, ChannelFits, ChannelValues, Coefficients, DesignMatrix, LeastSquaresSolver,
        NormalEquations, OutputPixelGrid, assemble,
    },
};

pub struct FlatFieldPipeline<R: ImageReader, W: ImageWriter> {
    reader: R,
    writer: W,
    config: ConversionConfig,
}

impl FlatFieldPipeline<StandardImageReader, StandardImageWriter> {
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            reader: StandardImageReader,
            writer: StandardImageWriter,
            config,
        }
    }
}

impl<R: ImageReader, W: ImageWriter> FlatFieldPipeline<R, W> {
    pub fn with_custom(reader: R, writer: W, config: ConversionConfig) -> Self {
        Self {
            reader,
            writer,
            config,
        }
    }

    fn validate_dimensions(&self, width: usize, height: usize) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if width == 0 || height == 0 {
            return Err(ConversionError::InvalidDimensions(width, height));
        }

        Ok(())
    }

    /// Fits one surface per channel. The SVD path factors the design matrix
    /// once and shares the decomposition read-only between the channel
    /// solves.
    #[instrument(skip_all, fields(width = grid.width(), height = grid.height(), method = ?self.config.fit_method))]
    pub fn fit(&self, grid: &PixelGrid) -> Result<ChannelFits> {
        self.validate_dimensions(grid.width(), grid.height())?;

        match self.config.fit_method {
            FitMethod::Svd => {
                let design = {
                    let _span = tracing::info_span!("build_design_matrix").entered();
                    DesignMatrix::new(grid.width(), grid.height())?
                };
                let solver = {
                    let _span = tracing::info_span!("factor_design_matrix").entered();
                    LeastSquaresSolver::new(design)?
                };
                self.solve_channels(|channel| {
                    let values = ChannelValues::from_grid(grid, channel);
                    let coefficients = solver.solve(&values)?;
                    log_fit(channel, &coefficients, grid, Some(&values));
                    Ok(coefficients)
                })
            }
            FitMethod::NormalEquations => self.solve_channels(|channel| {
                let coefficients = NormalEquations::from_grid(grid, channel).solve()?;
                log_fit(channel, &coefficients, grid, None);
                Ok(coefficients)
            }),
        }
    }

    fn solve_channels<F>(&self, solve: F) -> Result<ChannelFits>
    where
        F: Fn(Channel) -> Result<Coefficients> + Sync,
    {
        if self.config.parallel_channels {
            let (red, (green, blue)) = rayon::join(
                || solve(Channel::Red),
                || rayon::join(|| solve(Channel::Green), || solve(Channel::Blue)),
            );
            Ok(ChannelFits::new(red?, green?, blue?))
        } else {
            let red = solve(Channel::Red)?;
            let green = solve(Channel::Green)?;
            let blue = solve(Channel::Blue)?;
            Ok(ChannelFits::new(red, green, blue))
        }
    }

    /// Fits and evaluates the surfaces; the result replaces every input
    /// sample with its channel's fitted value.
    pub fn correct(&self, grid: &PixelGrid) -> Result<OutputPixelGrid> {
        let fits = self.fit(grid)?;
        let _span = tracing::info_span!("assemble").entered();
        Ok(assemble(grid.width(), grid.height(), &fits))
    }

    /// Decodes `input_data`, corrects it and encodes the result in the same
    /// format. Nothing is written to `output` unless every step succeeds.
    #[instrument(skip(self, input_data, output), fields(input_size = input_data.len()))]
    pub fn convert(&self, input_data: &[u8], output: &mut dyn Write) -> Result<FormatTag> {
        let mut timings = PipelineTimings::new();
        info!("Starting flat-field correction");

        let decoded = timings.record("decode", || {
            let _span = tracing::info_span!("decode_image").entered();
            self.reader.read_image(input_data)
        })?;

        let width = decoded.grid.width();
        let height = decoded.grid.height();
        info!(width, height, format = %decoded.format, "Decoded input");

        if !self.writer.supports(&decoded.format) {
            return Err(ConversionError::UnknownFormat(decoded.format.to_string()));
        }

        let corrected = timings.record("fit_and_assemble", || self.correct(&decoded.grid))?;

        let mut buffer = Vec::new();
        timings.record("encode", || {
            let _span = tracing::info_span!("encode_image", format = %decoded.format).entered();
            self.writer
                .write_image(&corrected, &decoded.format, &mut buffer, &self.config)
        })?;

        output.write_all(&buffer)?;

        timings.log_summary();
        info!(
            width,
            height,
            elapsed_ms = timings.total_duration().as_secs_f64() * 1000.0,
            "Correction complete"
        );
        Ok(decoded.format)
    }

    /// File-to-file correction. The output file is created only after the
    /// corrected image has been fully encoded.
    #[instrument(skip(self, input_path, output_path))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
    ) -> Result<FormatTag> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            "Correcting file"
        );

        let input_data = {
            let _span = tracing::info_span!("read_input_file").entered();
            std::fs::read(input_path).map_err(|e| {
                ConversionError::InputReadError(format!("{}: {}", input_path.display(), e))
            })?
        };

        let mut encoded = Vec::new();
        let format = self.convert(&input_data, &mut encoded)?;

        {
            let _span = tracing::info_span!("write_output_file").entered();
            std::fs::write(output_path, &encoded).map_err(|e| {
                ConversionError::OutputWriteError(format!(
                    "cannot write {} image to file {}: {}",
                    format,
                    output_path.display(),
                    e
                ))
            })?;
        }

        Ok(format)
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ConversionConfig) {
        self.config = config;
    }
}

/// Logs the fitted coefficients and their RMS residual. Paths that never
/// materialise the channel values pass `None`; they are extracted from the
/// grid only when debug output is enabled.
fn log_fit(
    channel: Channel,
    coefficients: &Coefficients,
    grid: &PixelGrid,
    values: Option<&ChannelValues>,
) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    let rms_residual = match values {
        Some(values) => coefficients.rms_residual(grid.width(), values),
        None => coefficients.rms_residual(grid.width(), &ChannelValues::from_grid(grid, channel)),
    };
    debug!(
        channel = %channel,
        coefficients = ?coefficients.as_array(),
        rms_residual,
        "Fitted channel surface"
    );
}
