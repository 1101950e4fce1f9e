//! 3x3 convolution and sharpening

use crate::{config::SharpenMode, error::Result, types::Image, utils::NumericValidator};
use image::RgbImage;

/// A 3x3 convolution kernel in row-major order
pub type Kernel3 = [[f32; 3]; 3];

/// Laplacian-style sharpening kernel
pub const SHARPEN_KERNEL: Kernel3 = [[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]];

/// The sharpening kernel with every coefficient multiplied by `factor`
#[must_use]
pub fn scaled_kernel(factor: f32) -> Kernel3 {
    SHARPEN_KERNEL.map(|row| row.map(|weight| weight * factor))
}

/// Mirror an out-of-range coordinate back into `[0, len)` without repeating the edge sample
#[inline]
fn reflect_101(index: i64, len: i64) -> usize {
    if len == 1 {
        return 0;
    }

    let period = 2 * (len - 1);
    let mut i = index.rem_euclid(period);
    if i >= len {
        i = period - i;
    }
    i as usize
}

/// Convolve each colour channel with a 3x3 kernel
///
/// Borders are mirrored without duplicating the edge sample, results are
/// rounded and saturated to `[0, 255]`.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn convolve3x3(image: &RgbImage, kernel: &Kernel3) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut out = RgbImage::new(width, height);
    let (w, h) = (i64::from(width), i64::from(height));

    for (x, y, target) in out.enumerate_pixels_mut() {
        let mut acc = [0.0f32; 3];
        for (ky, row) in kernel.iter().enumerate() {
            let sy = reflect_101(i64::from(y) + ky as i64 - 1, h) as u32;
            for (kx, weight) in row.iter().enumerate() {
                if *weight == 0.0 {
                    continue;
                }
                let sx = reflect_101(i64::from(x) + kx as i64 - 1, w) as u32;
                let source = image.get_pixel(sx, sy);
                for (channel, sum) in acc.iter_mut().enumerate() {
                    *sum += weight * f32::from(source[channel]);
                }
            }
        }
        target.0 = acc.map(NumericValidator::saturate_u8);
    }

    out
}

/// Sharpen the colour channels of an image
///
/// With [`SharpenMode::ScaledKernel`] the factor multiplies the kernel, so
/// `0.0` produces black. With [`SharpenMode::Blend`] the factor interpolates
/// between the source (`0.0`) and the fully sharpened image (`1.0`), and
/// extrapolates above one. Alpha is carried over unchanged.
///
/// # Errors
/// - `DimensionMismatch` if the convolved raster cannot be re-attached (never
///   expected for a well-formed image)
pub fn sharpen(image: &Image, factor: f32, mode: SharpenMode) -> Result<Image> {
    let rgb = image.to_rgb8();

    let sharpened = match mode {
        SharpenMode::ScaledKernel => convolve3x3(&rgb, &scaled_kernel(factor)),
        SharpenMode::Blend => {
            let full = convolve3x3(&rgb, &SHARPEN_KERNEL);
            let mut blended = rgb.clone();
            for (target, sharp) in blended.pixels_mut().zip(full.pixels()) {
                for (sample, sharp_sample) in target.0.iter_mut().zip(sharp.0) {
                    let source = f32::from(*sample);
                    *sample = NumericValidator::saturate_u8(
                        source + factor * (f32::from(sharp_sample) - source),
                    );
                }
            }
            blended
        },
    };

    image.replace_rgb(sharpened)
}
