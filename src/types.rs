//! Core types for image enhancement operations

use crate::{
    adjust::AdjustmentStage,
    config::OutputFormat,
    error::{EnhanceError, Result},
    services::ImageIOService,
};
use chrono::{DateTime, Utc};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// An 8-bit RGB raster, optionally carrying an alpha channel
///
/// This is the single pixel representation used at every module boundary.
/// Stages never mutate an `Image` in place; each one returns a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Image {
    /// Three channels, no alpha
    Rgb(RgbImage),
    /// Four channels, straight (non-premultiplied) alpha
    Rgba(RgbaImage),
}

impl Image {
    /// Convert a decoded `DynamicImage` into the canonical representation
    ///
    /// Sources that carry an alpha channel become `Rgba`, everything else
    /// becomes `Rgb`. Higher bit depths are reduced to 8 bits per sample.
    #[must_use]
    pub fn from_dynamic(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageRgb8(buffer) => Self::Rgb(buffer),
            DynamicImage::ImageRgba8(buffer) => Self::Rgba(buffer),
            other if other.color().has_alpha() => Self::Rgba(other.to_rgba8()),
            other => Self::Rgb(other.to_rgb8()),
        }
    }

    /// Build an image from a dense sample buffer
    ///
    /// # Errors
    /// - `Decode` when `channels` is not 3 or 4
    /// - `Decode` when the buffer length does not equal `width * height * channels`
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(EnhanceError::decode(format!(
                "Sample buffer holds {} bytes, expected {} for {}x{}x{}",
                data.len(),
                expected,
                width,
                height,
                channels
            )));
        }

        let image = match channels {
            3 => RgbImage::from_raw(width, height, data).map(Self::Rgb),
            4 => RgbaImage::from_raw(width, height, data).map(Self::Rgba),
            other => {
                return Err(EnhanceError::decode(format!(
                    "Unsupported channel count {} (expected 3 or 4)",
                    other
                )))
            },
        };

        image.ok_or_else(|| EnhanceError::decode("Sample buffer does not describe a dense raster"))
    }

    /// Create an RGB image filled with a single colour
    #[must_use]
    pub fn solid(width: u32, height: u32, color: RgbColor) -> Self {
        Self::Rgb(RgbImage::from_pixel(width, height, color.to_pixel()))
    }

    /// Convert into a `DynamicImage` for encoding or interop
    #[must_use]
    pub fn into_dynamic(self) -> DynamicImage {
        match self {
            Self::Rgb(buffer) => DynamicImage::ImageRgb8(buffer),
            Self::Rgba(buffer) => DynamicImage::ImageRgba8(buffer),
        }
    }

    /// Borrowing variant of [`Image::into_dynamic`]
    #[must_use]
    pub fn to_dynamic(&self) -> DynamicImage {
        self.clone().into_dynamic()
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        match self {
            Self::Rgb(buffer) => buffer.width(),
            Self::Rgba(buffer) => buffer.width(),
        }
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        match self {
            Self::Rgb(buffer) => buffer.height(),
            Self::Rgba(buffer) => buffer.height(),
        }
    }

    /// Image dimensions as `(width, height)`
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Number of samples per pixel (3 or 4)
    #[must_use]
    pub fn channels(&self) -> u8 {
        match self {
            Self::Rgb(_) => 3,
            Self::Rgba(_) => 4,
        }
    }

    #[must_use]
    pub fn has_alpha(&self) -> bool {
        matches!(self, Self::Rgba(_))
    }

    /// Number of pixels in the raster
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Raw interleaved samples
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        match self {
            Self::Rgb(buffer) => buffer.as_raw(),
            Self::Rgba(buffer) => buffer.as_raw(),
        }
    }

    /// Colour channels only, dropping alpha if present
    #[must_use]
    pub fn to_rgb8(&self) -> RgbImage {
        match self {
            Self::Rgb(buffer) => buffer.clone(),
            Self::Rgba(buffer) => DynamicImage::ImageRgba8(buffer.clone()).to_rgb8(),
        }
    }

    /// Four-channel copy; opaque alpha is added to RGB sources
    #[must_use]
    pub fn to_rgba8(&self) -> RgbaImage {
        match self {
            Self::Rgb(buffer) => DynamicImage::ImageRgb8(buffer.clone()).to_rgba8(),
            Self::Rgba(buffer) => buffer.clone(),
        }
    }

    /// Extract the alpha channel as a mask, if the image has one
    #[must_use]
    pub fn alpha_mask(&self) -> Option<AlphaMask> {
        match self {
            Self::Rgb(_) => None,
            Self::Rgba(buffer) => Some(AlphaMask::from_alpha_channel(buffer)),
        }
    }

    /// Attach a mask as the alpha channel of this image's colour samples
    ///
    /// # Errors
    /// - `DimensionMismatch` when the mask and the image differ in size
    pub fn with_alpha(&self, mask: &AlphaMask) -> Result<Self> {
        if mask.dimensions != self.dimensions() {
            return Err(EnhanceError::dimension_mismatch(
                "alpha attachment",
                self.dimensions(),
                mask.dimensions,
            ));
        }

        let rgb = self.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut rgba = RgbaImage::new(width, height);
        for ((source, target), alpha) in rgb.pixels().zip(rgba.pixels_mut()).zip(&mask.data) {
            target.0 = [source[0], source[1], source[2], *alpha];
        }

        Ok(Self::Rgba(rgba))
    }

    /// Apply a per-pixel colour transform, leaving alpha untouched
    #[must_use]
    pub fn map_rgb<F>(&self, mut transform: F) -> Self
    where
        F: FnMut([u8; 3]) -> [u8; 3],
    {
        match self {
            Self::Rgb(buffer) => {
                let mut out = buffer.clone();
                for pixel in out.pixels_mut() {
                    pixel.0 = transform(pixel.0);
                }
                Self::Rgb(out)
            },
            Self::Rgba(buffer) => {
                let mut out = buffer.clone();
                for pixel in out.pixels_mut() {
                    let [r, g, b, a] = pixel.0;
                    let [r, g, b] = transform([r, g, b]);
                    pixel.0 = [r, g, b, a];
                }
                Self::Rgba(out)
            },
        }
    }

    /// Visit the colour samples of every pixel in row-major order
    pub fn for_each_rgb<F>(&self, mut visit: F)
    where
        F: FnMut([u8; 3]),
    {
        match self {
            Self::Rgb(buffer) => buffer.pixels().for_each(|pixel| visit(pixel.0)),
            Self::Rgba(buffer) => buffer
                .pixels()
                .for_each(|pixel| visit([pixel[0], pixel[1], pixel[2]])),
        }
    }

    /// Replace the colour channels, keeping this image's alpha
    ///
    /// # Errors
    /// - `DimensionMismatch` when `rgb` differs in size from this image
    pub fn replace_rgb(&self, rgb: RgbImage) -> Result<Self> {
        if rgb.dimensions() != self.dimensions() {
            return Err(EnhanceError::dimension_mismatch(
                "colour replacement",
                self.dimensions(),
                rgb.dimensions(),
            ));
        }

        match self {
            Self::Rgb(_) => Ok(Self::Rgb(rgb)),
            Self::Rgba(buffer) => {
                let mut out = buffer.clone();
                for (target, source) in out.pixels_mut().zip(rgb.pixels()) {
                    target.0 = [source[0], source[1], source[2], target[3]];
                }
                Ok(Self::Rgba(out))
            },
        }
    }
}

impl From<RgbImage> for Image {
    fn from(buffer: RgbImage) -> Self {
        Self::Rgb(buffer)
    }
}

impl From<RgbaImage> for Image {
    fn from(buffer: RgbaImage) -> Self {
        Self::Rgba(buffer)
    }
}

impl From<DynamicImage> for Image {
    fn from(image: DynamicImage) -> Self {
        Self::from_dynamic(image)
    }
}

/// An opaque RGB colour, parsed from `#rrggbb` notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    /// Default background colour offered by the colour picker
    pub const PICKER_DEFAULT: Self = Self::new(0x00, 0xf9, 0x00);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[must_use]
    pub fn to_pixel(self) -> Rgb<u8> {
        Rgb([self.r, self.g, self.b])
    }
}

impl Default for RgbColor {
    fn default() -> Self {
        Self::PICKER_DEFAULT
    }
}

impl From<[u8; 3]> for RgbColor {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for RgbColor {
    type Err = EnhanceError;

    fn from_str(value: &str) -> Result<Self> {
        let hex = value.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);

        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(EnhanceError::invalid_config(format!(
                "Invalid colour '{}': expected #rrggbb",
                value
            )));
        }

        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|digits| u8::from_str_radix(digits, 16).ok())
                .ok_or_else(|| EnhanceError::invalid_config(format!("Invalid colour '{}'", value)))
        };

        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

/// Single-channel 8-bit opacity mask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlphaMask {
    /// Mask data as opacity values (0 = background, 255 = foreground)
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl AlphaMask {
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// Create mask from a grayscale image
    #[must_use]
    pub fn from_image(image: &GrayImage) -> Self {
        Self::new(image.as_raw().clone(), image.dimensions())
    }

    /// Take the alpha channel of an RGBA buffer
    #[must_use]
    pub fn from_alpha_channel(image: &RgbaImage) -> Self {
        let data = image.pixels().map(|pixel| pixel[3]).collect();
        Self::new(data, image.dimensions())
    }

    /// Convert mask to a grayscale image
    ///
    /// # Errors
    /// - `Processing` when the data length does not match the dimensions
    pub fn to_image(&self) -> Result<GrayImage> {
        let (width, height) = self.dimensions;
        ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(width, height, self.data.clone())
            .ok_or_else(|| EnhanceError::processing("Failed to create image from mask data"))
    }

    /// Resize the mask to new dimensions using Lanczos resampling
    ///
    /// # Errors
    /// - `Processing` when the mask data is inconsistent with its dimensions
    pub fn resize(&self, new_width: u32, new_height: u32) -> Result<AlphaMask> {
        let current = self.to_image()?;
        let resized = image::imageops::resize(
            &current,
            new_width,
            new_height,
            image::imageops::FilterType::Lanczos3,
        );

        Ok(AlphaMask::from_image(&resized))
    }

    /// Get mask statistics
    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = self.data.len();
        let foreground_pixels = self.data.iter().filter(|&&x| x > 127).count();
        let background_pixels = total_pixels - foreground_pixels;
        let ratio = |count: usize| {
            if total_pixels == 0 {
                0.0
            } else {
                count as f32 / total_pixels as f32
            }
        };

        MaskStatistics {
            total_pixels,
            foreground_pixels,
            background_pixels,
            foreground_ratio: ratio(foreground_pixels),
            background_ratio: ratio(background_pixels),
        }
    }
}

/// Statistics about an alpha mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub foreground_pixels: usize,
    pub background_pixels: usize,
    pub foreground_ratio: f32,
    pub background_ratio: f32,
}

/// Time spent in a single adjustment stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: AdjustmentStage,
    pub duration_ms: u64,
}

/// Detailed timing breakdown for one enhancement request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Input decoding (zero when the caller passes a decoded image)
    pub decode_ms: u64,

    /// Background removal through the segmentation adapter
    pub segmentation_ms: u64,

    /// Whole adjustment pipeline
    pub adjustment_ms: u64,

    /// Per-stage breakdown of `adjustment_ms`
    pub stages: Vec<StageTiming>,

    /// Background compositing
    pub compositing_ms: u64,

    /// Final encoding (if the result was encoded)
    pub encode_ms: Option<u64>,

    /// Total end-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Time not attributed to any measured phase
    #[must_use]
    pub fn other_overhead_ms(&self) -> u64 {
        let measured = self.decode_ms
            + self.segmentation_ms
            + self.adjustment_ms
            + self.compositing_ms
            + self.encode_ms.unwrap_or(0);
        self.total_ms.saturating_sub(measured)
    }
}

/// Metadata about the processing operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    /// Detailed timing breakdown
    pub timings: ProcessingTimings,

    /// Adjustment stages that actually ran, in execution order
    pub stages_applied: Vec<AdjustmentStage>,

    /// Description of the background mode used for compositing
    pub background: String,

    /// Whether the segmentation adapter ran
    pub segmented: bool,

    /// When processing finished
    pub processed_at: DateTime<Utc>,
}

impl ProcessingMetadata {
    #[must_use]
    pub fn new(background: String) -> Self {
        Self {
            timings: ProcessingTimings::new(),
            stages_applied: Vec::new(),
            background,
            segmented: false,
            processed_at: Utc::now(),
        }
    }
}

/// Result of an enhancement request
#[derive(Debug, Clone)]
pub struct EnhancementResult {
    /// The final, fully processed image
    pub image: Image,

    /// Background-removed foreground, when segmentation ran
    pub foreground: Option<Image>,

    /// Original image dimensions
    pub original_dimensions: (u32, u32),

    /// Processing metadata
    pub metadata: ProcessingMetadata,

    /// Original input path (for logging purposes)
    pub input_path: Option<String>,
}

impl EnhancementResult {
    #[must_use]
    pub fn new(image: Image, original_dimensions: (u32, u32), metadata: ProcessingMetadata) -> Self {
        Self {
            image,
            foreground: None,
            original_dimensions,
            metadata,
            input_path: None,
        }
    }

    /// Get image dimensions
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Get detailed timing breakdown
    #[must_use]
    pub fn timings(&self) -> &ProcessingTimings {
        &self.metadata.timings
    }

    /// Encode the final image in the specified format
    ///
    /// # Errors
    /// - Encoder failures
    pub fn to_bytes(&self, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        ImageIOService::encode(&self.image, format, quality)
    }

    /// Save the final image and record the encoding time
    ///
    /// # Errors
    /// - File system or encoder failures
    pub fn save<P: AsRef<Path>>(&mut self, path: P, format: OutputFormat, quality: u8) -> Result<()> {
        let encode_start = instant::Instant::now();
        ImageIOService::save_image(&self.image, path.as_ref(), format, quality)?;
        let encode_ms = encode_start.elapsed().as_millis() as u64;
        self.metadata.timings.encode_ms = Some(encode_ms);

        log::info!(
            "Processed: {} -> {} ({} stage(s), {}ms)",
            self.input_path.as_deref().unwrap_or("input"),
            path.as_ref().display(),
            self.metadata.stages_applied.len(),
            self.metadata.timings.total_ms + encode_ms
        );
        Ok(())
    }

    /// Save the final image as PNG
    ///
    /// # Errors
    /// - File system or encoder failures
    pub fn save_png<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.save(path, OutputFormat::Png, 100)
    }

    /// Get timing summary for display
    #[must_use]
    pub fn timing_summary(&self) -> String {
        let t = &self.metadata.timings;
        let mut summary = format!(
            "Total: {}ms | Decode: {}ms | Segmentation: {}ms | Adjust: {}ms | Composite: {}ms",
            t.total_ms, t.decode_ms, t.segmentation_ms, t.adjustment_ms, t.compositing_ms
        );

        if let Some(encode_ms) = t.encode_ms {
            summary.push_str(&format!(" | Encode: {}ms", encode_ms));
        }

        let other_ms = t.other_overhead_ms();
        if other_ms > 0 {
            summary.push_str(&format!(" | Other: {}ms", other_ms));
        }

        if !t.stages.is_empty() {
            let stages: Vec<String> = t
                .stages
                .iter()
                .map(|s| format!("{}={}ms", s.stage, s.duration_ms))
                .collect();
            summary.push_str(&format!(" [{}]", stages.join(", ")));
        }

        summary
    }
}
