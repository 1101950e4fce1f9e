//! Conversion of CLI arguments into processor configuration

use crate::cli::main_impl::{Cli, CliOutputFormat, CliPreset, CliSharpenMode};
use crate::{
    composite::BackgroundMode,
    config::{AdjustmentParameters, OutputFormat, SharpenMode},
    processor::{ProcessorConfig, ProcessorConfigBuilder},
    segmentation::MaskSegmenter,
    services::{ImageIOService, OutputFormatHandler},
};
use anyhow::{Context, Result};
use std::path::Path;

/// Builds library configuration from parsed arguments
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build `ProcessorConfig` from CLI arguments
    pub(crate) fn from_cli(cli: &Cli) -> Result<ProcessorConfig> {
        let output_format = match cli.format {
            Some(CliOutputFormat::Png) => OutputFormat::Png,
            Some(CliOutputFormat::Jpeg) => OutputFormat::Jpeg,
            None => Self::infer_output_format(cli),
        };

        ProcessorConfigBuilder::new()
            .adjustments(Self::adjustments(cli)?)
            .output_format(output_format)
            .jpeg_quality(cli.jpeg_quality)
            .debug(cli.verbose >= 2)
            .verbose_progress(cli.verbose >= 1)
            .build()
            .context("Invalid configuration")
    }

    /// Output format implied by `-o` when a single file is written
    fn infer_output_format(cli: &Cli) -> OutputFormat {
        let single_file = cli.input.len() == 1
            && cli.input.first().is_some_and(|input| !Path::new(input).is_dir());
        match cli.output.as_deref() {
            Some(output) if single_file && output != "-" => {
                OutputFormatHandler::from_path(output).unwrap_or_else(|e| {
                    log::debug!("{}, writing PNG", e);
                    OutputFormat::default()
                })
            },
            _ => OutputFormat::default(),
        }
    }

    /// Resolve adjustment parameters
    ///
    /// The preset or parameter file provides the base; explicit flags override it.
    pub(crate) fn adjustments(cli: &Cli) -> Result<AdjustmentParameters> {
        let base = match (&cli.params, cli.preset) {
            (Some(path), _) => AdjustmentParameters::from_json_file(path)
                .with_context(|| format!("Failed to read parameters from {}", path.display()))?,
            (None, Some(CliPreset::Showcase)) => AdjustmentParameters::showcase(),
            (None, None) => AdjustmentParameters::default(),
        };

        let mut builder = AdjustmentParameters::builder()
            .brightness(cli.brightness.unwrap_or(base.brightness))
            .contrast(cli.contrast.unwrap_or(base.contrast))
            .saturation(cli.saturation.unwrap_or(base.saturation))
            .sharpness(cli.sharpness.unwrap_or(base.sharpness))
            .gamma(cli.gamma.unwrap_or(base.gamma))
            .equalize_histogram(cli.equalize || base.equalize_histogram)
            .sharpen_mode(base.sharpen_mode);

        if let Some(mode) = cli.sharpen_mode {
            builder = builder.sharpen_mode(match mode {
                CliSharpenMode::Kernel => SharpenMode::ScaledKernel,
                CliSharpenMode::Blend => SharpenMode::Blend,
            });
        }

        Ok(builder.build())
    }

    /// Resolve the background from `--background-color` / `--background-image`
    pub(crate) fn background_mode(cli: &Cli) -> Result<BackgroundMode> {
        let image = match (&cli.background_image, cli.background_color) {
            (Some(path), None) => Some(
                ImageIOService::load_image(path)
                    .with_context(|| format!("Failed to load background image {}", path.display()))?,
            ),
            (Some(path), Some(color)) => {
                log::warn!(
                    "Both --background-color {} and --background-image {} given; using the colour",
                    color,
                    path.display()
                );
                None
            },
            (None, _) => None,
        };

        Ok(BackgroundMode::resolve(cli.background_color, image))
    }

    /// Segmentation adapter backed by `--mask`, if given
    pub(crate) fn segmenter(cli: &Cli) -> Result<Option<MaskSegmenter>> {
        cli.mask
            .as_ref()
            .map(|path| {
                MaskSegmenter::from_path(path)
                    .with_context(|| format!("Failed to load mask {}", path.display()))
            })
            .transpose()
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.jpeg_quality > 100 {
            anyhow::bail!("JPEG quality must be between 0 and 100, got {}", cli.jpeg_quality);
        }

        if cli.params.is_some() && cli.preset.is_some() {
            log::warn!("--params overrides --preset");
        }

        let factors = [
            ("brightness", cli.brightness),
            ("contrast", cli.contrast),
            ("saturation", cli.saturation),
            ("sharpness", cli.sharpness),
            ("gamma", cli.gamma),
        ];
        for (name, value) in factors {
            if let Some(value) = value {
                if !value.is_finite() {
                    anyhow::bail!("--{} must be a finite number", name);
                }
            }
        }

        if cli.output.as_deref() == Some("-") && cli.input.len() > 1 {
            anyhow::bail!("Cannot use stdout (-) as output when processing multiple inputs");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RgbColor;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("imgly-enhance").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_config_conversion() {
        let cli = parse(&["in.png", "--brightness", "1.4", "--format", "jpeg", "--jpeg-quality", "70", "-vv"]);
        let config = CliConfigBuilder::from_cli(&cli).unwrap();
        assert_eq!(config.output_format, OutputFormat::Jpeg);

        // Explicit --format wins over the output extension
        let cli = parse(&["in.png", "-o", "out.jpg", "--format", "png"]);
        assert_eq!(CliConfigBuilder::from_cli(&cli).unwrap().output_format, OutputFormat::Png);
        assert_eq!(config.jpeg_quality, 70);
        assert!(config.debug);
        assert!((config.adjustments.brightness - 1.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_output_format_inferred_from_extension() {
        let config = CliConfigBuilder::from_cli(&parse(&["in.png", "-o", "out.JPEG"])).unwrap();
        assert_eq!(config.output_format, OutputFormat::Jpeg);

        for args in [
            &["in.jpg", "-o", "out.png"][..],
            &["in.jpg", "-o", "out.webp"][..],
            &["in.jpg", "-o", "-"][..],
            &["in.jpg"][..],
            &["a.jpg", "b.jpg", "-o", "batch.jpg"][..],
        ] {
            let config = CliConfigBuilder::from_cli(&parse(args)).unwrap();
            assert_eq!(config.output_format, OutputFormat::Png, "{:?}", args);
        }
    }

    #[test]
    fn test_flags_override_preset() {
        let cli = parse(&["in.png", "--preset", "showcase", "--gamma", "1.0", "--sharpen-mode", "blend"]);
        let params = CliConfigBuilder::adjustments(&cli).unwrap();
        assert!((params.brightness - 0.82).abs() < f32::EPSILON);
        assert!((params.gamma - 1.0).abs() < f32::EPSILON);
        assert!(params.equalize_histogram);
        assert_eq!(params.sharpen_mode, SharpenMode::Blend);
    }

    #[test]
    fn test_out_of_range_flag_is_clamped() {
        let cli = parse(&["in.png", "--saturation", "5"]);
        let params = CliConfigBuilder::adjustments(&cli).unwrap();
        assert!((params.saturation - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_params_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"contrast": 1.3, "equalize_histogram": true}"#).unwrap();

        let cli = parse(&["in.png", "--params", path.to_str().unwrap(), "--contrast", "0.7"]);
        let params = CliConfigBuilder::adjustments(&cli).unwrap();
        assert!((params.contrast - 0.7).abs() < f32::EPSILON);
        assert!(params.equalize_histogram);
    }

    #[test]
    fn test_background_color_wins() {
        let cli = parse(&[
            "in.png",
            "--background-color",
            "#102030",
            "--background-image",
            "does-not-exist.png",
        ]);
        let mode = CliConfigBuilder::background_mode(&cli).unwrap();
        assert_eq!(mode, BackgroundMode::SolidColor(RgbColor::new(0x10, 0x20, 0x30)));
    }

    #[test]
    fn test_cli_validation() {
        let cli = parse(&["a.png", "b.png", "-o", "-"]);
        assert!(CliConfigBuilder::validate_cli(&cli).is_err());

        let cli = parse(&["a.png", "--brightness", "NaN"]);
        assert!(CliConfigBuilder::validate_cli(&cli).is_err());

        let cli = parse(&["a.png"]);
        assert!(CliConfigBuilder::validate_cli(&cli).is_ok());
        assert!(CliConfigBuilder::segmenter(&cli).unwrap().is_none());
    }
}
