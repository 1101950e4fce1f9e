#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # IMG.LY Image Enhancement Library
//!
//! A deterministic image adjustment pipeline plus a background compositor for
//! background-removed photos.
//!
//! ## Features
//!
//! - **Adjustment pipeline**: brightness, contrast, saturation, sharpness, gamma and
//!   histogram equalization, always applied in that order; neutral stages are skipped
//! - **Compositing**: place a foreground over a solid colour or a resized background image
//! - **Segmentation seam**: plug a background-removal model in through
//!   [`SegmentationAdapter`]; [`MaskSegmenter`] applies a pre-computed mask
//! - **Format support**: PNG and JPEG input and output
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use imgly_enhance::{enhance_image, AdjustmentParameters, Image, RgbColor};
//!
//! let image = Image::solid(100, 100, RgbColor::new(128, 128, 128));
//! let params = AdjustmentParameters::builder().brightness(1.5).build();
//!
//! let brighter = enhance_image(&image, &params)?;
//! assert_eq!(brighter.dimensions(), (100, 100));
//! assert!(brighter.as_raw().iter().all(|&v| v == 192));
//! # Ok::<(), imgly_enhance::EnhanceError>(())
//! ```
//!
//! ## Compositing a segmented photo
//!
//! ```rust,no_run
//! use imgly_enhance::{
//!     AlphaMask, BackgroundMode, EnhancementProcessor, MaskSegmenter, ProcessorConfig, RgbColor,
//! };
//!
//! # fn example(mask: AlphaMask) -> anyhow::Result<()> {
//! let mut processor = EnhancementProcessor::new(ProcessorConfig::default())?
//!     .with_segmenter(Box::new(MaskSegmenter::new(mask)));
//!
//! let background = BackgroundMode::SolidColor("#00f900".parse::<RgbColor>()?);
//! let mut result = processor.process_file("portrait.jpg", &background)?;
//! result.save_png("portrait_enhanced.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface, progress bar and tracing subscriber setup
//! - `tracing-json`: JSON log output for the CLI
//! - `tracing-files`: log file output for the CLI
//!
//! To use only as a library without CLI dependencies:
//!
//! ```toml
//! [dependencies]
//! imgly-enhance = { version = "0.1", default-features = false }
//! ```

pub mod adjust;
#[cfg(feature = "cli")]
pub mod cli;
pub mod composite;
pub mod config;
pub mod error;
pub mod processor;
pub mod segmentation;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

use tokio::io::AsyncRead;

pub use adjust::{apply, AdjustmentPipeline, AdjustmentStage, PipelineRun};
pub use composite::{BackgroundMode, Compositor};
pub use config::{
    AdjustmentParameters, AdjustmentParametersBuilder, EnhanceConfig, EnhanceConfigBuilder,
    OutputFormat, SharpenMode,
};
pub use error::{EnhanceError, Result};
pub use processor::{EnhancementProcessor, ProcessorConfig, ProcessorConfigBuilder};
pub use segmentation::{MaskSegmenter, SegmentationAdapter};
pub use services::{
    ConsoleProgressReporter, ImageIOService, NoOpProgressReporter, OutputFormatHandler,
    ProcessingStage, ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use types::{
    AlphaMask, EnhancementResult, Image, MaskStatistics, ProcessingMetadata, ProcessingTimings,
    RgbColor, StageTiming,
};
pub use utils::NumericValidator;

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, spans, TracingConfig, TracingFormat, TracingOutput};

/// Run the adjustment pipeline over an image
///
/// Factors are clamped into `[0.0, 2.0]`; the identity parameter set returns
/// an equal image.
pub fn enhance_image(image: &Image, params: &AdjustmentParameters) -> Result<Image> {
    adjust::apply(image, params)
}

/// Decode, adjust and re-encode an image held in memory
///
/// Out-of-range factors in `config` are clamped, as with [`enhance_image`];
/// only the JPEG quality is rejected when invalid.
///
/// # Examples
/// ```rust,no_run
/// use imgly_enhance::{enhance_bytes, EnhanceConfig, AdjustmentParameters, OutputFormat};
///
/// # fn example(upload: Vec<u8>) -> anyhow::Result<()> {
/// let config = EnhanceConfig::builder()
///     .adjustments(AdjustmentParameters::showcase())
///     .output_format(OutputFormat::Jpeg)
///     .build()?;
/// let jpeg = enhance_bytes(&upload, &config)?;
/// # Ok(())
/// # }
/// ```
pub fn enhance_bytes(image_bytes: &[u8], config: &EnhanceConfig) -> Result<Vec<u8>> {
    NumericValidator::validate_quality(config.jpeg_quality)?;
    let image = ImageIOService::load_from_bytes(image_bytes)?;
    let adjusted = adjust::apply(&image, &config.adjustments.clamped())?;
    ImageIOService::encode(&adjusted, config.output_format, config.jpeg_quality)
}

/// Read an image from an async stream and run the full processor over it
///
/// No segmentation adapter and no background are used; the result carries the
/// adjusted image with timings. Factors are clamped as in [`enhance_bytes`].
///
/// # Examples
/// ```rust,no_run
/// use imgly_enhance::{enhance_from_reader, EnhanceConfig};
/// use tokio::fs::File;
///
/// # async fn example() -> anyhow::Result<()> {
/// let file = File::open("photo.png").await?;
/// let mut result = enhance_from_reader(file, &EnhanceConfig::default()).await?;
/// result.save_png("photo_enhanced.png")?;
/// # Ok(())
/// # }
/// ```
pub async fn enhance_from_reader<R: AsyncRead + Unpin>(reader: R, config: &EnhanceConfig) -> Result<EnhancementResult> {
    NumericValidator::validate_quality(config.jpeg_quality)?;
    let decode_start = instant::Instant::now();
    let image = ImageIOService::load_from_reader(reader).await?;
    let decode_ms = decode_start.elapsed().as_millis() as u64;

    let mut processor = EnhancementProcessor::new(ProcessorConfig::from(config.clone()))?;
    let mut result = processor.process_image(&image, &BackgroundMode::None)?;
    result.metadata.timings.decode_ms = decode_ms;
    result.metadata.timings.total_ms += decode_ms;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhance_bytes_round_trip() {
        let image = Image::solid(8, 8, RgbColor::new(100, 100, 100));
        let png = ImageIOService::encode(&image, OutputFormat::Png, 100).unwrap();

        let config = EnhanceConfig::builder()
            .adjustments(AdjustmentParameters::builder().brightness(2.0).build())
            .build()
            .unwrap();
        let out = enhance_bytes(&png, &config).unwrap();
        let decoded = ImageIOService::load_from_bytes(&out).unwrap();
        assert!(decoded.as_raw().iter().all(|&v| v == 200));
    }

    #[tokio::test]
    async fn test_enhance_from_reader() {
        let image = Image::solid(4, 4, RgbColor::new(10, 20, 30));
        let png = ImageIOService::encode(&image, OutputFormat::Png, 100).unwrap();

        let result = enhance_from_reader(std::io::Cursor::new(png), &EnhanceConfig::default())
            .await
            .unwrap();
        assert_eq!(result.image, image);
        assert_eq!(result.metadata.background, "none");
    }

    fn brightness_overflow_config() -> EnhanceConfig {
        serde_json::from_str(r#"{"adjustments": {"brightness": 2.5}, "output_format": "Png", "jpeg_quality": 90, "debug": false}"#)
            .unwrap()
    }

    #[test]
    fn test_enhance_bytes_clamps_out_of_range_factors() {
        let config = brightness_overflow_config();
        assert_eq!(config.adjustments.brightness, 2.5);

        let image = Image::solid(3, 3, RgbColor::new(100, 60, 200));
        let png = ImageIOService::encode(&image, OutputFormat::Png, 100).unwrap();
        let out = enhance_bytes(&png, &config).unwrap();

        let clamped = enhance_image(&image, &config.adjustments).unwrap();
        assert_eq!(ImageIOService::load_from_bytes(&out).unwrap(), clamped);
        assert!(clamped.as_raw().chunks_exact(3).all(|p| p == [200, 120, 255]));

        let mut bad_quality = config;
        bad_quality.jpeg_quality = 120;
        assert!(matches!(enhance_bytes(&png, &bad_quality), Err(EnhanceError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_enhance_from_reader_clamps_out_of_range_factors() {
        let image = Image::solid(2, 2, RgbColor::new(100, 60, 200));
        let png = ImageIOService::encode(&image, OutputFormat::Png, 100).unwrap();

        let result = enhance_from_reader(std::io::Cursor::new(png), &brightness_overflow_config())
            .await
            .unwrap();
        assert_eq!(result.metadata.stages_applied, vec![AdjustmentStage::Brightness]);
        assert!(result.image.as_raw().chunks_exact(3).all(|p| p == [200, 120, 255]));
    }
}
