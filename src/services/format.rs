//! Output format handling service

use crate::{
    config::OutputFormat,
    error::{EnhanceError, Result},
    types::Image,
};
use std::path::Path;

/// Service for output format decisions
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Shape an image for the target format
    ///
    /// JPEG cannot carry transparency, so RGBA input is reduced to its
    /// colour channels. PNG keeps the image as is.
    ///
    /// # Examples
    /// ```rust
    /// use imgly_enhance::{services::OutputFormatHandler, Image, OutputFormat, RgbColor};
    ///
    /// let image = Image::solid(2, 2, RgbColor::new(1, 2, 3));
    /// let prepared = OutputFormatHandler::prepare(&image, OutputFormat::Jpeg);
    /// assert!(!prepared.has_alpha());
    /// ```
    #[must_use]
    pub fn prepare(image: &Image, format: OutputFormat) -> Image {
        match (format, image) {
            (OutputFormat::Jpeg, Image::Rgba(_)) => Image::Rgb(image.to_rgb8()),
            _ => image.clone(),
        }
    }

    /// File extension (without the dot) for a format
    ///
    /// ```rust
    /// use imgly_enhance::{services::OutputFormatHandler, OutputFormat};
    ///
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Jpeg), "jpg");
    /// ```
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// Guess the output format from a path's extension
    ///
    /// # Errors
    /// - `UnsupportedFormat` for missing or unknown extensions
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<OutputFormat> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "" => Err(EnhanceError::unsupported_format(format!(
                "'{}' has no file extension",
                path.as_ref().display()
            ))),
            other => Err(EnhanceError::unsupported_format(other.to_string())),
        }
    }

    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        matches!(format, OutputFormat::Png)
    }

    /// Warn when transparent content is about to be flattened by the encoder
    pub fn warn_if_alpha_lost(image: &Image, format: OutputFormat) {
        if image.has_alpha() && !Self::supports_transparency(format) {
            log::warn!(
                "Output format {} does not support transparency; alpha will be discarded",
                format
            );
        }
    }
}
