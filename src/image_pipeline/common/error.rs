use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("{0}")]
    UsageError(String),

    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to encode {format} image: {message}")]
    EncodeError { format: String, message: String },

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Singular system while fitting {channel} channel: {reason}")]
    SingularSystem { channel: String, reason: String },

    #[error("unknown image format: {0}")]
    UnknownFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConversionError {
    /// Process exit status for this failure. Read-side failures use 255 and
    /// write-side failures use 2 so callers can tell the phases apart.
    pub fn exit_code(&self) -> u8 {
        match self {
            ConversionError::UsageError(_) => 1,
            ConversionError::InputReadError(_)
            | ConversionError::DecodeError(_)
            | ConversionError::InvalidDimensions(_, _) => 255,
            ConversionError::SingularSystem { .. } => 3,
            ConversionError::OutputWriteError(_)
            | ConversionError::EncodeError { .. }
            | ConversionError::UnknownFormat(_)
            | ConversionError::IoError(_) => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConversionError>;
