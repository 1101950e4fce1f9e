//! Background compositing
//!
//! The foreground is placed over either a solid colour or a background image
//! resized to the foreground's dimensions, using an alpha mask as the blend
//! weight. The result is always an opaque RGB image.

use crate::{
    error::{EnhanceError, Result},
    types::{AlphaMask, Image, RgbColor},
};
use image::{imageops::FilterType, RgbImage};
use tracing::instrument;

/// What to put behind the foreground
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackgroundMode {
    /// Leave the foreground as it is (transparency is kept)
    #[default]
    None,
    /// Fill the background with a single colour
    SolidColor(RgbColor),
    /// Use another image, resized to the foreground's size
    Image(Image),
}

impl BackgroundMode {
    /// Pick a mode from optional user selections
    ///
    /// A solid colour takes precedence over a background image when both are
    /// given; neither yields [`BackgroundMode::None`].
    #[must_use]
    pub fn resolve(solid: Option<RgbColor>, image: Option<Image>) -> Self {
        match (solid, image) {
            (Some(color), Some(_)) => {
                log::debug!("Both background colour and image supplied, using colour {}", color);
                Self::SolidColor(color)
            },
            (Some(color), None) => Self::SolidColor(color),
            (None, Some(image)) => Self::Image(image),
            (None, None) => Self::None,
        }
    }

    /// Short human readable description for logs and metadata
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::None => "none".to_string(),
            Self::SolidColor(color) => format!("color {}", color),
            Self::Image(image) => {
                let (width, height) = image.dimensions();
                format!("image {}x{}", width, height)
            },
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Blends a foreground over a background
#[derive(Debug, Default, Clone, Copy)]
pub struct Compositor;

impl Compositor {
    /// Composite `foreground` over the background described by `mode`
    ///
    /// The blend weight comes from `mask` when given, otherwise from the
    /// foreground's own alpha channel. Without either, the foreground is
    /// pasted opaquely. `BackgroundMode::None` returns the foreground unchanged.
    ///
    /// # Errors
    /// - `DimensionMismatch` when the mask size differs from the foreground
    /// - `DimensionMismatch` when the background cannot be resized to the
    ///   foreground's size (for example a zero-sized image)
    #[instrument(skip_all, fields(background = %mode.describe(), width = foreground.width(), height = foreground.height()))]
    pub fn composite(
        foreground: &Image,
        mask: Option<&AlphaMask>,
        mode: &BackgroundMode,
    ) -> Result<Image> {
        let background = match mode {
            BackgroundMode::None => return Ok(foreground.clone()),
            BackgroundMode::SolidColor(color) => {
                let (width, height) = foreground.dimensions();
                RgbImage::from_pixel(width, height, color.to_pixel())
            },
            BackgroundMode::Image(image) => Self::fit_background(image, foreground.dimensions())?,
        };

        let owned_mask;
        let mask = match mask {
            Some(mask) => Some(mask),
            None => {
                owned_mask = foreground.alpha_mask();
                owned_mask.as_ref()
            },
        };

        if let Some(mask) = mask {
            if mask.dimensions != foreground.dimensions()
                || mask.data.len() != foreground.pixel_count()
            {
                return Err(EnhanceError::dimension_mismatch(
                    "compositing mask",
                    foreground.dimensions(),
                    mask.dimensions,
                ));
            }
        }

        let foreground_rgb = foreground.to_rgb8();
        let Some(mask) = mask else {
            log::debug!("No alpha available, foreground covers the background");
            return Ok(Image::Rgb(foreground_rgb));
        };

        let mut output = background;
        for ((target, source), alpha) in output
            .pixels_mut()
            .zip(foreground_rgb.pixels())
            .zip(mask.data.iter())
        {
            for (bg, fg) in target.0.iter_mut().zip(source.0) {
                *bg = blend_sample(fg, *bg, *alpha);
            }
        }

        Ok(Image::Rgb(output))
    }

    /// Resize a background image to the target size (colour channels only)
    ///
    /// # Errors
    /// - `DimensionMismatch` when either side has a zero dimension or the
    ///   resize does not produce the requested size
    pub fn fit_background(background: &Image, target: (u32, u32)) -> Result<RgbImage> {
        let source = background.dimensions();
        if source.0 == 0 || source.1 == 0 || target.0 == 0 || target.1 == 0 {
            return Err(EnhanceError::dimension_mismatch("background resize", target, source));
        }

        let rgb = background.to_rgb8();
        if source == target {
            return Ok(rgb);
        }

        log::debug!(
            "Resizing background from {}x{} to {}x{}",
            source.0,
            source.1,
            target.0,
            target.1
        );
        let resized = image::imageops::resize(&rgb, target.0, target.1, FilterType::Lanczos3);
        if resized.dimensions() != target {
            return Err(EnhanceError::dimension_mismatch(
                "background resize",
                target,
                resized.dimensions(),
            ));
        }
        Ok(resized)
    }
}

/// `(fg * a + bg * (255 - a)) / 255`, rounded
#[inline]
fn blend_sample(foreground: u8, background: u8, alpha: u8) -> u8 {
    let a = u32::from(alpha);
    let weighted = u32::from(foreground) * a + u32::from(background) * (255 - a);
    ((weighted + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn half_transparent(width: u32, height: u32) -> Image {
        Image::Rgba(RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([200, 10, 10, 255])
            } else {
                Rgba([200, 10, 10, 0])
            }
        }))
    }

    #[test]
    fn test_resolve_prefers_solid_color() {
        let color = RgbColor::new(1, 2, 3);
        let image = Image::solid(2, 2, RgbColor::new(9, 9, 9));
        assert_eq!(
            BackgroundMode::resolve(Some(color), Some(image.clone())),
            BackgroundMode::SolidColor(color)
        );
        assert_eq!(BackgroundMode::resolve(None, Some(image.clone())), BackgroundMode::Image(image));
        assert_eq!(BackgroundMode::resolve(None, None), BackgroundMode::None);
    }

    #[test]
    fn test_blend_sample_endpoints() {
        assert_eq!(blend_sample(200, 50, 255), 200);
        assert_eq!(blend_sample(200, 50, 0), 50);
        assert_eq!(blend_sample(255, 0, 128), 128);
    }

    #[test]
    fn test_solid_color_fills_transparent_area() {
        let foreground = half_transparent(4, 2);
        let out = Compositor::composite(
            &foreground,
            None,
            &BackgroundMode::SolidColor(RgbColor::new(0, 249, 0)),
        )
        .unwrap();

        let Image::Rgb(buffer) = out else {
            panic!("composite output must be RGB");
        };
        assert_eq!(buffer.get_pixel(0, 0).0, [200, 10, 10]);
        assert_eq!(buffer.get_pixel(3, 1).0, [0, 249, 0]);
    }

    #[test]
    fn test_background_image_is_resized() {
        let foreground = half_transparent(6, 4);
        let background = Image::solid(17, 3, RgbColor::new(30, 60, 90));
        let out = Compositor::composite(&foreground, None, &BackgroundMode::Image(background))
            .unwrap();
        assert_eq!(out.dimensions(), (6, 4));
        assert!(!out.has_alpha());
    }

    #[test]
    fn test_none_returns_foreground() {
        let foreground = half_transparent(4, 4);
        let out = Compositor::composite(&foreground, None, &BackgroundMode::None).unwrap();
        assert_eq!(out, foreground);
    }

    #[test]
    fn test_explicit_mask_overrides_alpha() {
        let foreground = Image::solid(2, 1, RgbColor::new(100, 100, 100));
        let mask = AlphaMask::new(vec![255, 0], (2, 1));
        let out = Compositor::composite(
            &foreground,
            Some(&mask),
            &BackgroundMode::SolidColor(RgbColor::new(0, 0, 0)),
        )
        .unwrap();
        assert_eq!(out.as_raw(), &[100, 100, 100, 0, 0, 0]);
    }

    #[test]
    fn test_opaque_foreground_without_mask() {
        let foreground = Image::solid(3, 3, RgbColor::new(5, 6, 7));
        let out = Compositor::composite(
            &foreground,
            None,
            &BackgroundMode::SolidColor(RgbColor::new(255, 255, 255)),
        )
        .unwrap();
        assert_eq!(out, foreground);
    }

    #[test]
    fn test_mask_size_mismatch() {
        let foreground = Image::solid(3, 3, RgbColor::new(5, 6, 7));
        let mask = AlphaMask::new(vec![255; 4], (2, 2));
        let err = Compositor::composite(
            &foreground,
            Some(&mask),
            &BackgroundMode::SolidColor(RgbColor::default()),
        )
        .unwrap_err();
        assert!(matches!(err, EnhanceError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_zero_sized_background_is_rejected() {
        let foreground = half_transparent(4, 4);
        let background = Image::Rgb(RgbImage::new(0, 0));
        let err = Compositor::composite(&foreground, None, &BackgroundMode::Image(background))
            .unwrap_err();
        assert!(matches!(err, EnhanceError::DimensionMismatch { .. }));
    }
}
