//! Brightness and contrast enhancement
//!
//! Both stages blend the source towards a "degenerate" reference image:
//! `out = degenerate + factor * (source - degenerate)`. Brightness uses black
//! as the reference, contrast uses a flat image at the mean luma level.

use crate::{types::Image, utils::NumericValidator};

/// Blend a sample away from (or towards) a reference level, truncating the result
#[inline]
fn blend(degenerate: f32, sample: u8, factor: f32) -> u8 {
    NumericValidator::truncate_u8(f64::from(degenerate + factor * (f32::from(sample) - degenerate)))
}

/// Rec. 601 luma of an 8-bit RGB sample, in 16.16 fixed point with rounding
#[inline]
#[must_use]
pub fn luma([r, g, b]: [u8; 3]) -> u8 {
    let weighted = u32::from(r) * 19_595 + u32::from(g) * 38_470 + u32::from(b) * 7_471 + 0x8000;
    (weighted >> 16) as u8
}

/// Rounded mean luma of the image (0 for an empty image)
#[must_use]
pub fn mean_luma(image: &Image) -> u8 {
    let count = image.pixel_count() as u64;
    if count == 0 {
        return 0;
    }

    let mut sum = 0u64;
    image.for_each_rgb(|pixel| sum += u64::from(luma(pixel)));
    ((sum as f64 / count as f64) + 0.5) as u8
}

/// Scale every colour sample relative to black
///
/// `0.0` yields black, `1.0` is the identity, values above one brighten and
/// saturate at white.
#[must_use]
pub fn brightness(image: &Image, factor: f32) -> Image {
    image.map_rgb(|pixel| pixel.map(|sample| blend(0.0, sample, factor)))
}

/// Stretch or compress colour samples around the image's mean gray level
///
/// `0.0` yields a flat gray image, `1.0` is the identity.
#[must_use]
pub fn contrast(image: &Image, factor: f32) -> Image {
    let mean = f32::from(mean_luma(image));
    log::trace!("contrast pivot (mean luma): {}", mean);
    image.map_rgb(|pixel| pixel.map(|sample| blend(mean, sample, factor)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RgbColor;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_brightness_scales_towards_white() {
        let gray = Image::solid(4, 4, RgbColor::new(128, 128, 128));
        let brighter = brightness(&gray, 1.5);
        assert!(brighter.as_raw().iter().all(|&v| v == 192));

        let black = brightness(&gray, 0.0);
        assert!(black.as_raw().iter().all(|&v| v == 0));

        let saturated = brightness(&gray, 2.0);
        assert!(saturated.as_raw().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_brightness_truncates_fractional_results() {
        // 0.82 * 101 = 82.82
        let image = Image::solid(1, 1, RgbColor::new(101, 100, 1));
        assert_eq!(brightness(&image, 0.82).as_raw(), &[82, 82, 0]);
        // 1.5 * 101 = 151.5
        assert_eq!(brightness(&image, 1.5).as_raw(), &[151, 150, 1]);
    }

    #[test]
    fn test_brightness_keeps_alpha() {
        let image = Image::Rgba(RgbaImage::from_pixel(2, 2, Rgba([100, 50, 10, 33])));
        let out = brightness(&image, 0.5);
        assert_eq!(out.as_raw(), &[50u8, 25, 5, 33].repeat(4)[..]);
    }

    #[test]
    fn test_luma_weights() {
        assert_eq!(luma([255, 255, 255]), 255);
        assert_eq!(luma([0, 0, 0]), 0);
        assert_eq!(luma([255, 0, 0]), 76);
        assert_eq!(luma([0, 255, 0]), 150);
        assert_eq!(luma([0, 0, 255]), 29);
    }

    #[test]
    fn test_contrast_pivots_on_mean() {
        // Half black, half white: mean luma rounds to 128
        let image = Image::Rgb(RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        }));
        assert_eq!(mean_luma(&image), 128);

        let flat = contrast(&image, 0.0);
        assert!(flat.as_raw().iter().all(|&v| v == 128));

        let softer = contrast(&image, 0.5);
        // 128 + 0.5 * 127 = 191.5 truncates
        assert_eq!(softer.as_raw(), &[64, 64, 64, 191, 191, 191]);
    }

    #[test]
    fn test_contrast_on_uniform_image_is_stable() {
        let gray = Image::solid(3, 3, RgbColor::new(90, 90, 90));
        assert_eq!(contrast(&gray, 1.7), gray);
    }
}
