//! Configuration types for image enhancement operations

use crate::{
    error::{EnhanceError, Result},
    utils::NumericValidator,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lower bound of every adjustment factor
pub const FACTOR_MIN: f32 = 0.0;

/// Upper bound of every adjustment factor
pub const FACTOR_MAX: f32 = 2.0;

/// Factor value at which a stage is skipped
pub const NEUTRAL_FACTOR: f32 = 1.0;

/// How the sharpness factor is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharpenMode {
    /// Multiply the whole 3x3 kernel by the factor (factor 0 produces black)
    #[default]
    #[serde(rename = "kernel")]
    ScaledKernel,
    /// Interpolate between the source and the kernel-sharpened image by the factor
    Blend,
}

impl std::fmt::Display for SharpenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScaledKernel => write!(f, "kernel"),
            Self::Blend => write!(f, "blend"),
        }
    }
}

/// Parameter set for the adjustment pipeline
///
/// Every factor lives in `[0.0, 2.0]` with `1.0` as the neutral value.
/// Values coming through the builder are clamped rather than rejected;
/// [`AdjustmentParameters::validate`] offers the strict check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentParameters {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub sharpness: f32,
    pub gamma: f32,
    pub equalize_histogram: bool,
    pub sharpen_mode: SharpenMode,
}

impl Default for AdjustmentParameters {
    fn default() -> Self {
        Self {
            brightness: NEUTRAL_FACTOR,
            contrast: NEUTRAL_FACTOR,
            saturation: NEUTRAL_FACTOR,
            sharpness: NEUTRAL_FACTOR,
            gamma: NEUTRAL_FACTOR,
            equalize_histogram: false,
            sharpen_mode: SharpenMode::ScaledKernel,
        }
    }
}

impl AdjustmentParameters {
    /// Create a new parameter builder starting from neutral values
    ///
    /// # Examples
    /// ```rust
    /// use imgly_enhance::AdjustmentParameters;
    ///
    /// let params = AdjustmentParameters::builder()
    ///     .brightness(1.2)
    ///     .gamma(5.0) // clamped to 2.0
    ///     .equalize_histogram(true)
    ///     .build();
    /// assert_eq!(params.gamma, 2.0);
    /// ```
    #[must_use]
    pub fn builder() -> AdjustmentParametersBuilder {
        AdjustmentParametersBuilder::default()
    }

    /// Sample look used by the showcase page: slightly darker, lifted midtones, equalized
    #[must_use]
    pub fn showcase() -> Self {
        Self {
            brightness: 0.82,
            gamma: 1.29,
            equalize_histogram: true,
            ..Self::default()
        }
    }

    /// True when running the pipeline would leave the image untouched
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_identity(&self) -> bool {
        self.brightness == NEUTRAL_FACTOR
            && self.contrast == NEUTRAL_FACTOR
            && self.saturation == NEUTRAL_FACTOR
            && self.sharpness == NEUTRAL_FACTOR
            && self.gamma == NEUTRAL_FACTOR
            && !self.equalize_histogram
    }

    /// Copy with every factor clamped into `[0.0, 2.0]`
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            brightness: clamp_logged("brightness", self.brightness),
            contrast: clamp_logged("contrast", self.contrast),
            saturation: clamp_logged("saturation", self.saturation),
            sharpness: clamp_logged("sharpness", self.sharpness),
            gamma: clamp_logged("gamma", self.gamma),
            ..*self
        }
    }

    /// Strict range check
    ///
    /// # Errors
    /// - `ParameterOutOfRange` naming the first factor outside `[0.0, 2.0]`
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.factors() {
            NumericValidator::validate_factor(value, FACTOR_MIN, FACTOR_MAX, name)?;
        }
        Ok(())
    }

    /// Named factors in pipeline order
    #[must_use]
    pub fn factors(&self) -> [(&'static str, f32); 5] {
        [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
            ("sharpness", self.sharpness),
            ("gamma", self.gamma),
        ]
    }

    /// Parse parameters from JSON; missing fields take their neutral value
    ///
    /// # Errors
    /// - `InvalidConfig` on malformed JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)
            .map_err(|e| EnhanceError::invalid_config(format!("Invalid parameter JSON: {}", e)))?;
        Ok(params.clamped())
    }

    /// Read parameters from a JSON file
    ///
    /// # Errors
    /// - File read failures
    /// - `InvalidConfig` on malformed JSON
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EnhanceError::file_io_error("read parameter file", path, &e))?;
        Self::from_json_str(&content)
    }

    /// Serialize parameters as pretty-printed JSON
    ///
    /// # Errors
    /// - Serialization failures
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EnhanceError::processing(format!("Failed to serialize parameters: {}", e)))
    }
}

#[allow(clippy::float_cmp)]
fn clamp_logged(name: &str, value: f32) -> f32 {
    let clamped = NumericValidator::clamp_factor(value, FACTOR_MIN, FACTOR_MAX, NEUTRAL_FACTOR);
    if clamped != value {
        log::warn!(
            "{} factor {} outside [{}, {}], using {}",
            name,
            value,
            FACTOR_MIN,
            FACTOR_MAX,
            clamped
        );
    }
    clamped
}

/// Builder for `AdjustmentParameters`
#[derive(Debug, Default)]
pub struct AdjustmentParametersBuilder {
    params: AdjustmentParameters,
}

impl AdjustmentParametersBuilder {
    #[must_use]
    pub fn brightness(mut self, factor: f32) -> Self {
        self.params.brightness = clamp_logged("brightness", factor);
        self
    }

    #[must_use]
    pub fn contrast(mut self, factor: f32) -> Self {
        self.params.contrast = clamp_logged("contrast", factor);
        self
    }

    #[must_use]
    pub fn saturation(mut self, factor: f32) -> Self {
        self.params.saturation = clamp_logged("saturation", factor);
        self
    }

    #[must_use]
    pub fn sharpness(mut self, factor: f32) -> Self {
        self.params.sharpness = clamp_logged("sharpness", factor);
        self
    }

    #[must_use]
    pub fn gamma(mut self, factor: f32) -> Self {
        self.params.gamma = clamp_logged("gamma", factor);
        self
    }

    #[must_use]
    pub fn equalize_histogram(mut self, enabled: bool) -> Self {
        self.params.equalize_histogram = enabled;
        self
    }

    #[must_use]
    pub fn sharpen_mode(mut self, mode: SharpenMode) -> Self {
        self.params.sharpen_mode = mode;
        self
    }

    #[must_use]
    pub fn build(self) -> AdjustmentParameters {
        self.params
    }
}

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// PNG, keeps the alpha channel when present
    #[default]
    Png,
    /// JPEG (no transparency, alpha is dropped)
    Jpeg,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
        }
    }
}

/// Configuration for a full enhancement request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhanceConfig {
    /// Adjustment factors applied by the pipeline
    pub adjustments: AdjustmentParameters,

    /// Output format
    pub output_format: OutputFormat,

    /// JPEG quality (0-100, only used for JPEG output)
    pub jpeg_quality: u8,

    /// Enable debug mode (per-stage timing logs)
    pub debug: bool,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            adjustments: AdjustmentParameters::default(),
            output_format: OutputFormat::default(),
            jpeg_quality: 90,
            debug: false,
        }
    }
}

impl EnhanceConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> EnhanceConfigBuilder {
        EnhanceConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Invalid JPEG quality value (must be 0-100)
    /// - Adjustment factors outside `[0.0, 2.0]`
    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_quality(self.jpeg_quality)?;
        self.adjustments.validate()
    }
}

/// Builder for `EnhanceConfig`
#[derive(Debug, Default)]
pub struct EnhanceConfigBuilder {
    config: EnhanceConfig,
}

impl EnhanceConfigBuilder {
    #[must_use]
    pub fn adjustments(mut self, adjustments: AdjustmentParameters) -> Self {
        self.config.adjustments = adjustments.clamped();
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.min(100);
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - Validation failures
    pub fn build(self) -> Result<EnhanceConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters_are_identity() {
        let params = AdjustmentParameters::default();
        assert!(params.is_identity());
        assert!(params.validate().is_ok());
        assert_eq!(params.sharpen_mode, SharpenMode::ScaledKernel);
    }

    #[test]
    fn test_builder_clamps_out_of_range() {
        let params = AdjustmentParameters::builder()
            .brightness(-0.5)
            .contrast(7.0)
            .saturation(f32::NAN)
            .sharpness(0.0)
            .gamma(2.0)
            .build();

        assert_eq!(params.brightness, 0.0);
        assert_eq!(params.contrast, 2.0);
        assert_eq!(params.saturation, 1.0);
        assert_eq!(params.sharpness, 0.0);
        assert_eq!(params.gamma, 2.0);
        assert!(params.validate().is_ok());
        assert!(!params.is_identity());
    }

    #[test]
    fn test_strict_validation() {
        let params = AdjustmentParameters {
            gamma: 2.5,
            ..AdjustmentParameters::default()
        };
        match params.validate() {
            Err(EnhanceError::ParameterOutOfRange { parameter, value, .. }) => {
                assert_eq!(parameter, "gamma");
                assert_eq!(value, 2.5);
            },
            other => panic!("expected ParameterOutOfRange, got {:?}", other),
        }
        assert_eq!(params.clamped().gamma, 2.0);
    }

    #[test]
    fn test_equalize_only_is_not_identity() {
        let params = AdjustmentParameters::builder().equalize_histogram(true).build();
        assert!(!params.is_identity());
    }

    #[test]
    fn test_showcase_preset() {
        let params = AdjustmentParameters::showcase();
        assert_eq!(params.brightness, 0.82);
        assert_eq!(params.gamma, 1.29);
        assert!(params.equalize_histogram);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_json_round_trip_and_partial_input() {
        let params = AdjustmentParameters::from_json_str(
            r#"{"brightness": 1.4, "sharpen_mode": "blend", "gamma": 9.0}"#,
        )
        .unwrap();
        assert_eq!(params.brightness, 1.4);
        assert_eq!(params.contrast, 1.0);
        assert_eq!(params.gamma, 2.0);
        assert_eq!(params.sharpen_mode, SharpenMode::Blend);

        let json = params.to_json_string().unwrap();
        assert!(json.contains("\"sharpen_mode\": \"blend\""));

        assert!(matches!(
            AdjustmentParameters::from_json_str("{not json"),
            Err(EnhanceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_enhance_config_builder() {
        let config = EnhanceConfig::builder()
            .output_format(OutputFormat::Jpeg)
            .jpeg_quality(150)
            .adjustments(AdjustmentParameters {
                contrast: 3.0,
                ..AdjustmentParameters::default()
            })
            .build()
            .unwrap();

        assert_eq!(config.output_format, OutputFormat::Jpeg);
        assert_eq!(config.jpeg_quality, 100);
        assert_eq!(config.adjustments.contrast, 2.0);

        let mut config = EnhanceConfig::default();
        config.jpeg_quality = 101;
        assert!(config.validate().is_err());
    }
}
