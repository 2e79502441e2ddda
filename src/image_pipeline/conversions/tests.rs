use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use crate::image_pipeline::common::config::{ConversionConfig, FitMethod};
use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::conversions::FlatFieldPipeline;
use crate::image_pipeline::decode::{DecodedImage, FormatTag, ImageReader, PixelGrid};
use crate::image_pipeline::encode::ImageWriter;
use crate::image_pipeline::surface::{OPAQUE, OutputPixelGrid};

struct MockReader {
    should_fail: bool,
    grid: PixelGrid,
    format: FormatTag,
}

impl ImageReader for MockReader {
    fn read_image(&self, _data: &[u8]) -> Result<DecodedImage> {
        if self.should_fail {
            return Err(ConversionError::DecodeError("Mock decode error".to_string()));
        }
        Ok(DecodedImage {
            grid: self.grid.clone(),
            format: self.format.clone(),
        })
    }
}

struct MockWriter {
    should_fail: bool,
    written_data: Arc<Mutex<Vec<OutputPixelGrid>>>,
}

impl ImageWriter for MockWriter {
    fn supports(&self, format: &FormatTag) -> bool {
        !matches!(format, FormatTag::Unsupported(_))
    }

    fn write_image(
        &self,
        image: &OutputPixelGrid,
        _format: &FormatTag,
        output: &mut dyn Write,
        _config: &ConversionConfig,
    ) -> Result<()> {
        if self.should_fail {
            return Err(ConversionError::EncodeError {
                format: "tiff".to_string(),
                message: "Mock encode error".to_string(),
            });
        }
        self.written_data.lock().unwrap().push(image.clone());
        output.write_all(b"encoded")?;
        Ok(())
    }
}

/// Every channel is exactly 50 + 2x + 3y.
fn plane_grid() -> PixelGrid {
    PixelGrid::from_fn(4, 4, |x, y| {
        let v = (50 + 2 * x + 3 * y) as u16;
        [v, v, v]
    })
}

fn pipeline_with(
    grid: PixelGrid,
    format: FormatTag,
    reader_fails: bool,
    writer_fails: bool,
    config: ConversionConfig,
) -> (FlatFieldPipeline<MockReader, MockWriter>, Arc<Mutex<Vec<OutputPixelGrid>>>) {
    let written = Arc::new(Mutex::new(Vec::new()));
    let reader = MockReader { should_fail: reader_fails, grid, format };
    let writer = MockWriter { should_fail: writer_fails, written_data: written.clone() };
    (FlatFieldPipeline::with_custom(reader, writer, config), written)
}

#[test]
fn test_plane_image_is_reproduced() {
    for method in [FitMethod::Svd, FitMethod::NormalEquations] {
        for parallel in [true, false] {
            let config = ConversionConfig::builder()
                .fit_method(method)
                .parallel_channels(parallel)
                .build();
            let (pipeline, written) = pipeline_with(plane_grid(), FormatTag::Tiff, false, false, config);

            let mut output = Cursor::new(Vec::new());
            let format = pipeline.convert(b"fake image data", &mut output).unwrap();
            assert_eq!(format, FormatTag::Tiff);
            assert_eq!(output.into_inner(), b"encoded".to_vec());

            let written = written.lock().unwrap();
            assert_eq!(written.len(), 1);
            let input = plane_grid();
            for y in 0..4 {
                for x in 0..4 {
                    let [r, g, b] = input.pixel(x, y);
                    assert_eq!(written[0].pixel(x, y), [r, g, b, OPAQUE], "{:?} at ({}, {})", method, x, y);
                }
            }
        }
    }
}

#[test]
fn test_parallel_and_sequential_fits_agree() {
    let grid = PixelGrid::from_fn(9, 7, |x, y| {
        [
            (3000 + 17 * x * y + (x * 31 + y * 11) % 9) as u16,
            (900 + x * x * 5) as u16,
            (40000 - 300 * y) as u16,
        ]
    });
    let sequential = FlatFieldPipeline::new(ConversionConfig::builder().parallel_channels(false).build());
    let parallel = FlatFieldPipeline::new(ConversionConfig::builder().parallel_channels(true).build());

    assert_eq!(sequential.fit(&grid).unwrap(), parallel.fit(&grid).unwrap());
}

#[test]
fn test_reader_failure() {
    let (pipeline, written) =
        pipeline_with(plane_grid(), FormatTag::Tiff, true, false, ConversionConfig::default());

    let mut output = Cursor::new(Vec::new());
    let result = pipeline.convert(b"fake image data", &mut output);

    assert!(matches!(result.unwrap_err(), ConversionError::DecodeError(_)));
    assert!(written.lock().unwrap().is_empty());
}

#[test]
fn test_writer_failure_leaves_output_empty() {
    let (pipeline, _) =
        pipeline_with(plane_grid(), FormatTag::Tiff, false, true, ConversionConfig::default());

    let mut output = Cursor::new(Vec::new());
    let result = pipeline.convert(b"fake image data", &mut output);

    assert!(matches!(result.unwrap_err(), ConversionError::EncodeError { .. }));
    assert!(output.into_inner().is_empty());
}

#[test]
fn test_unknown_format_is_not_written() {
    let (pipeline, written) = pipeline_with(
        plane_grid(),
        FormatTag::Unsupported("gif".to_string()),
        false,
        false,
        ConversionConfig::default(),
    );

    let mut output = Cursor::new(Vec::new());
    let result = pipeline.convert(b"fake image data", &mut output);

    assert!(matches!(result.unwrap_err(), ConversionError::UnknownFormat(ref f) if f == "gif"));
    assert!(written.lock().unwrap().is_empty());
    assert!(output.into_inner().is_empty());
}

#[test]
fn test_single_row_image_is_singular() {
    let grid = PixelGrid::from_fn(8, 1, |x, _| [x as u16, 1, 2]);
    for method in [FitMethod::Svd, FitMethod::NormalEquations] {
        let config = ConversionConfig::builder().fit_method(method).build();
        let (pipeline, written) = pipeline_with(grid.clone(), FormatTag::Jpeg, false, false, config);

        let mut output = Cursor::new(Vec::new());
        let result = pipeline.convert(b"fake image data", &mut output);

        assert!(matches!(result.unwrap_err(), ConversionError::SingularSystem { .. }));
        assert!(written.lock().unwrap().is_empty());
    }
}

#[test]
fn test_dimension_validation_failure() {
    let empty = PixelGrid::new(0, 5, Vec::new()).unwrap();
    let (pipeline, _) = pipeline_with(empty, FormatTag::Tiff, false, false, ConversionConfig::default());

    let mut output = Cursor::new(Vec::new());
    let result = pipeline.convert(b"fake image data", &mut output);

    assert!(matches!(result.unwrap_err(), ConversionError::InvalidDimensions(0, 5)));
}

mod files {
    use super::*;
    use crate::image_pipeline::surface::{ChannelFits, Coefficients, assemble};
    use tiff::decoder::{Decoder, DecodingResult};

    fn quadratic(x: usize, y: usize) -> u16 {
        (1000 + 50 * x + 20 * y + 3 * x * x + 2 * y * y + x * y) as u16
    }

    fn write_rgb16_tiff(path: &std::path::Path, width: u32, height: u32) {
        let mut data = Vec::new();
        for y in 0..height as usize {
            for x in 0..width as usize {
                data.extend_from_slice(&[quadratic(x, y), 2 * quadratic(x, y), 777]);
            }
        }
        let file = std::fs::File::create(path).unwrap();
        let mut encoder = tiff::encoder::TiffEncoder::new(file).unwrap();
        encoder
            .write_image::<tiff::encoder::colortype::RGB16>(width, height, &data)
            .unwrap();
    }

    #[test]
    fn test_tiff_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.tiff");
        let output = dir.path().join("output.tiff");
        write_rgb16_tiff(&input, 8, 6);

        let pipeline = FlatFieldPipeline::new(ConversionConfig::default());
        let format = pipeline.convert_file(&input, &output).unwrap();
        assert_eq!(format, FormatTag::Tiff);

        let mut decoder = Decoder::new(std::fs::File::open(&output).unwrap()).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (8, 6));
        let DecodingResult::U16(data) = decoder.read_image().unwrap() else {
            panic!("expected 16-bit samples");
        };

        let fits = ChannelFits::new(
            Coefficients::new([1000.0, 50.0, 20.0, 3.0, 2.0, 1.0]),
            Coefficients::new([2000.0, 100.0, 40.0, 6.0, 4.0, 2.0]),
            Coefficients::new([777.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        );
        assert_eq!(data, assemble(8, 6, &fits).data());
    }

    #[test]
    fn test_png_input_leaves_output_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.png");
        let fresh = dir.path().join("fresh.png");
        let existing = dir.path().join("existing.png");
        image::RgbImage::from_fn(5, 5, |x, y| image::Rgb([x as u8, y as u8, 9]))
            .save(&input)
            .unwrap();
        std::fs::write(&existing, b"keep me").unwrap();

        let pipeline = FlatFieldPipeline::new(ConversionConfig::default());

        let result = pipeline.convert_file(&input, &fresh);
        assert!(matches!(result.unwrap_err(), ConversionError::UnknownFormat(ref f) if f == "png"));
        assert!(!fresh.exists());

        let result = pipeline.convert_file(&input, &existing);
        assert!(matches!(result.unwrap_err(), ConversionError::UnknownFormat(_)));
        assert_eq!(std::fs::read(&existing).unwrap(), b"keep me");
    }

    #[test]
    fn test_missing_input_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = FlatFieldPipeline::new(ConversionConfig::default());
        let result = pipeline.convert_file(dir.path().join("nope.tiff"), dir.path().join("out.tiff"));

        let err = result.unwrap_err();
        assert!(matches!(err, ConversionError::InputReadError(_)));
        assert_eq!(err.exit_code(), 255);
    }

    #[test]
    fn test_unwritable_output_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.tiff");
        write_rgb16_tiff(&input, 4, 4);

        let pipeline = FlatFieldPipeline::new(ConversionConfig::default());
        let result = pipeline.convert_file(&input, dir.path().join("missing_dir").join("out.tiff"));

        let err = result.unwrap_err();
        assert!(matches!(err, ConversionError::OutputWriteError(_)));
        assert_eq!(err.exit_code(), 2);
    }
}

mod diagnostics {
    use std::fmt;

    use super::*;
    use tracing::field::{Field, Visit};
    use tracing_subscriber::Layer;
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    /// Collects `(channel, rms_residual)` from every event that carries both.
    struct ResidualRecorder(Arc<Mutex<Vec<(String, f64)>>>);

    #[derive(Default)]
    struct ResidualVisitor {
        channel: Option<String>,
        rms: Option<f64>,
    }

    impl Visit for ResidualVisitor {
        fn record_f64(&mut self, field: &Field, value: f64) {
            if field.name() == "rms_residual" {
                self.rms = Some(value);
            }
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "channel" {
                self.channel = Some(format!("{:?}", value));
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for ResidualRecorder {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = ResidualVisitor::default();
            event.record(&mut visitor);
            if let (Some(channel), Some(rms)) = (visitor.channel, visitor.rms) {
                self.0.lock().unwrap().push((channel, rms));
            }
        }
    }

    fn logged_residuals(method: FitMethod, grid: &PixelGrid) -> Vec<(String, f64)> {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry()
            .with(LevelFilter::DEBUG)
            .with(ResidualRecorder(recorded.clone()));
        // Sequential so every solve runs on the thread holding the subscriber.
        let config = ConversionConfig::builder()
            .fit_method(method)
            .parallel_channels(false)
            .build();
        let pipeline = FlatFieldPipeline::new(config);

        tracing::subscriber::with_default(subscriber, || pipeline.fit(grid)).unwrap();
        let residuals = recorded.lock().unwrap().clone();
        residuals
    }

    #[test]
    fn test_every_fit_method_logs_channel_residuals() {
        for method in [FitMethod::Svd, FitMethod::NormalEquations] {
            let residuals = logged_residuals(method, &plane_grid());
            let channels: Vec<&str> = residuals.iter().map(|(c, _)| c.as_str()).collect();
            assert_eq!(channels, ["red", "green", "blue"], "{:?}", method);
            for (channel, rms) in &residuals {
                assert!(rms.abs() < 1e-6, "{:?} {} rms {}", method, channel, rms);
            }
        }
    }

    #[test]
    fn test_residuals_agree_between_fit_methods() {
        let grid = PixelGrid::from_fn(9, 7, |x, y| {
            let bump = if (x + 2 * y) % 3 == 0 { 40 } else { 0 };
            [(1000 + 5 * x + bump) as u16, (2000 + 3 * y) as u16, (300 + x * y + bump) as u16]
        });

        let svd = logged_residuals(FitMethod::Svd, &grid);
        let normal = logged_residuals(FitMethod::NormalEquations, &grid);
        assert_eq!(svd.len(), 3);
        assert_eq!(normal.len(), 3);
        for ((channel, a), (_, b)) in svd.iter().zip(normal.iter()) {
            assert!((a - b).abs() < 1e-6, "{}: {} vs {}", channel, a, b);
        }
        assert!(svd[0].1 > 1.0);
        assert!(svd[1].1 < 1e-6);
        assert!(svd[2].1 > 1.0);
    }
}
