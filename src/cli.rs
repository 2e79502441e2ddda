//! Command-line surface of the `flatfit` binary.
//!
//! Flags are declared as long options but also accepted with a single dash
//! (`-input photo.tiff`), which is how the tool has always been invoked.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, ValueEnum};

use crate::image_pipeline::{ConversionConfig, ConversionError, FitMethod, Result, TiffCompression};

#[derive(Parser, Debug)]
#[command(name = "flatfit")]
#[command(version, about = "Replace each color channel with its fitted illumination surface", long_about = None)]
pub struct Cli {
    /// input file
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// output file
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Least-squares method used for the channel fits
    #[arg(long, value_enum, default_value_t = MethodArg::Svd)]
    pub method: MethodArg,

    /// JPEG output quality
    #[arg(long, value_name = "1-100", default_value_t = 75, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub jpeg_quality: u8,

    /// TIFF output compression
    #[arg(long, value_enum, default_value_t = CompressionArg::Deflate)]
    pub compression: CompressionArg,

    /// Disable the horizontal-differencing predictor for TIFF output
    #[arg(long)]
    pub no_predictor: bool,

    /// Fit the three channels one after another instead of in parallel
    #[arg(long)]
    pub sequential: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodArg {
    Svd,
    NormalEquations,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionArg {
    None,
    Lzw,
    DeflateFast,
    Deflate,
    DeflateBest,
}

/// A validated request: both paths present, config assembled.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub input: PathBuf,
    pub output: PathBuf,
    pub config: ConversionConfig,
}

impl Cli {
    pub fn into_invocation(self) -> Result<Invocation> {
        let input = required(self.input, "missing input file name")?;
        let output = required(self.output, "missing output file name")?;

        let config = ConversionConfig::builder()
            .fit_method(match self.method {
                MethodArg::Svd => FitMethod::Svd,
                MethodArg::NormalEquations => FitMethod::NormalEquations,
            })
            .compression(match self.compression {
                CompressionArg::None => TiffCompression::None,
                CompressionArg::Lzw => TiffCompression::Lzw,
                CompressionArg::DeflateFast => TiffCompression::DeflateFast,
                CompressionArg::Deflate => TiffCompression::DeflateBalanced,
                CompressionArg::DeflateBest => TiffCompression::DeflateBest,
            })
            .predictor(if self.no_predictor { None } else { Some(2) })
            .jpeg_quality(self.jpeg_quality)
            .parallel_channels(!self.sequential)
            .build();

        Ok(Invocation { input, output, config })
    }
}

fn required(path: Option<PathBuf>, message: &str) -> Result<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| ConversionError::UsageError(message.to_string()))
}

/// Rewrites `-name` and `-name=value` to their `--` form for every long flag
/// the parser knows. Arguments after a bare `--` are left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let command = Cli::command();
    let mut known: Vec<&str> = command.get_arguments().filter_map(|a| a.get_long()).collect();
    known.extend(["help", "version"]);

    let mut out = Vec::new();
    let mut passthrough = false;
    for (i, arg) in args.into_iter().map(Into::into).enumerate() {
        if i == 0 || passthrough {
            out.push(arg);
            continue;
        }
        if arg.to_str() == Some("--") {
            passthrough = true;
            out.push(arg);
            continue;
        }
        let rewritten = arg.to_str().and_then(|s| {
            let name = s.strip_prefix('-').filter(|rest| !rest.starts_with('-'))?;
            let flag = name.split('=').next().unwrap_or(name);
            (flag.len() > 1 && known.contains(&flag)).then(|| OsString::from(format!("-{}", s)))
        });
        out.push(rewritten.unwrap_or(arg));
    }
    out
}

pub fn parse_from<I, T>(args: I) -> std::result::Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    Cli::try_parse_from(normalize_args(args))
}

/// Full help text, printed after a usage error so the available flags are
/// listed.
pub fn usage() -> String {
    Cli::command().render_help().to_string()
}
