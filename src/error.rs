//! Error types for image enhancement operations

use thiserror::Error;

/// Result type alias for enhancement operations
pub type Result<T> = std::result::Result<T, EnhanceError>;

/// Error types for decoding, adjustment, compositing and encoding
#[derive(Error, Debug)]
pub enum EnhanceError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding errors reported by the codec layer
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Malformed or unsupported input image
    #[error("Decode error: {0}")]
    Decode(String),

    /// Two rasters that must share a size do not, and could not be reconciled
    #[error("Dimension mismatch in {context}: expected {}x{}, got {}x{}", expected.0, expected.1, actual.0, actual.1)]
    DimensionMismatch {
        context: String,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Adjustment factor outside its permitted range (strict validation only)
    #[error("Parameter {parameter} out of range: {value} (valid range: {min}-{max})")]
    ParameterOutOfRange {
        parameter: String,
        value: f32,
        min: f32,
        max: f32,
    },

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unsupported file format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Failure reported by a segmentation adapter
    #[error("Segmentation error: {0}")]
    Segmentation(String),

    /// Pixel processing errors
    #[error("Processing error: {0}")]
    Processing(String),
}

impl EnhanceError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(format: S) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// Create a new segmentation error
    pub fn segmentation<S: Into<String>>(msg: S) -> Self {
        Self::Segmentation(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch<S: Into<String>>(
        context: S,
        expected: (u32, u32),
        actual: (u32, u32),
    ) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Create a parameter range error
    pub fn parameter_out_of_range<S: Into<String>>(parameter: S, value: f32, min: f32, max: f32) -> Self {
        Self::ParameterOutOfRange {
            parameter: parameter.into(),
            value,
            min,
            max,
        }
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }
}
