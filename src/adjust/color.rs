//! 8-bit HSV conversion and saturation scaling
//!
//! Hue is stored in `[0, 180)` (degrees halved) so that it fits a byte;
//! saturation and value use the full `[0, 255]` range.

use crate::{types::Image, utils::NumericValidator};

/// Convert an RGB sample to 8-bit HSV
#[must_use]
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let saturation = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let hue_degrees = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    let hue_degrees = if hue_degrees < 0.0 {
        hue_degrees + 360.0
    } else {
        hue_degrees
    };

    let hue = (hue_degrees / 2.0).round() as u16 % 180;

    [
        hue as u8,
        NumericValidator::saturate_u8(saturation),
        max as u8,
    ]
}

/// Convert an 8-bit HSV sample back to RGB
#[must_use]
pub fn hsv_to_rgb([h, s, v]: [u8; 3]) -> [u8; 3] {
    if s == 0 {
        return [v, v, v];
    }

    let value = f32::from(v) / 255.0;
    let sat = f32::from(s) / 255.0;
    let sector_position = (f32::from(h) * 2.0 / 60.0) % 6.0;
    let sector = sector_position.floor();
    let fraction = sector_position - sector;

    let p = value * (1.0 - sat);
    let q = value * (1.0 - sat * fraction);
    let t = value * (1.0 - sat * (1.0 - fraction));

    let (r, g, b) = match sector as u8 {
        0 => (value, t, p),
        1 => (q, value, p),
        2 => (p, value, t),
        3 => (p, q, value),
        4 => (t, p, value),
        _ => (value, p, q),
    };

    [r, g, b].map(|channel| NumericValidator::saturate_u8(channel * 255.0))
}

/// Scale an 8-bit saturation sample, clipping into `[0, 255]` and truncating
#[inline]
#[must_use]
pub fn scale_saturation(saturation: u8, factor: f32) -> u8 {
    let scaled = f32::from(saturation) * factor;
    if scaled.is_nan() {
        0
    } else {
        scaled.clamp(0.0, 255.0) as u8
    }
}

/// Scale the HSV saturation of every pixel by `factor`
///
/// `0.0` produces a grayscale image (value channel preserved), `1.0` is the
/// identity up to conversion rounding.
#[must_use]
pub fn saturation(image: &Image, factor: f32) -> Image {
    image.map_rgb(|pixel| {
        let [h, s, v] = rgb_to_hsv(pixel);
        hsv_to_rgb([h, scale_saturation(s, factor), v])
    })
}
