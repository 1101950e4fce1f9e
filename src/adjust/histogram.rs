//! Luma histogram equalization in YCrCb space
//!
//! Colour conversion uses 14-bit fixed point so results are reproducible
//! bit for bit across platforms.

use crate::{types::Image, utils::NumericValidator};

const SHIFT: i32 = 14;
const HALF: i32 = 1 << (SHIFT - 1);
const CHROMA_OFFSET: i32 = 128;

#[inline]
fn descale(value: i32) -> i32 {
    (value + HALF) >> SHIFT
}

#[inline]
fn saturate(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Convert an RGB sample to `[Y, Cr, Cb]`
#[must_use]
pub fn rgb_to_ycrcb([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
    let y = descale(r * 4899 + g * 9617 + b * 1868);
    let cr = descale((r - y) * 11682 + (CHROMA_OFFSET << SHIFT));
    let cb = descale((b - y) * 9241 + (CHROMA_OFFSET << SHIFT));
    [saturate(y), saturate(cr), saturate(cb)]
}

/// Convert a `[Y, Cr, Cb]` sample back to RGB
#[must_use]
pub fn ycrcb_to_rgb([y, cr, cb]: [u8; 3]) -> [u8; 3] {
    let y = i32::from(y);
    let cr = i32::from(cr) - CHROMA_OFFSET;
    let cb = i32::from(cb) - CHROMA_OFFSET;

    let r = y + descale(cr * 22987);
    let g = y + descale(cb * -5636 + cr * -11698);
    let b = y + descale(cb * 29049);
    [saturate(r), saturate(g), saturate(b)]
}

/// Build the equalization lookup table for a 256-bin histogram
///
/// The first occupied bin maps to zero and the rest follow the scaled
/// cumulative distribution. A histogram with a single occupied bin maps
/// every level to that bin, leaving uniform images unchanged.
#[must_use]
pub fn equalization_lut(histogram: &[u64; 256]) -> [u8; 256] {
    let mut lut = [0u8; 256];
    let total: u64 = histogram.iter().sum();

    let Some(first) = histogram.iter().position(|&count| count > 0) else {
        return lut;
    };

    if histogram[first] == total {
        return [first as u8; 256];
    }

    let scale = 255.0 / (total - histogram[first]) as f64;
    let mut cumulative = 0u64;
    for (entry, count) in lut.iter_mut().zip(histogram.iter()).skip(first + 1) {
        cumulative += count;
        *entry = NumericValidator::saturate_u8((cumulative as f64 * scale) as f32);
    }
    lut
}

/// Equalize the luma histogram while keeping chroma
///
/// The image is converted to YCrCb, the Y channel is remapped through the
/// cumulative histogram, and the result is converted back. Alpha is kept.
#[must_use]
pub fn equalize(image: &Image) -> Image {
    if image.pixel_count() == 0 {
        return image.clone();
    }

    let mut histogram = [0u64; 256];
    image.for_each_rgb(|pixel| {
        let [y, _, _] = rgb_to_ycrcb(pixel);
        histogram[usize::from(y)] += 1;
    });

    let lut = equalization_lut(&histogram);
    log::trace!("equalization lut: {:?}", &lut[..]);
    image.map_rgb(|pixel| {
        let [y, cr, cb] = rgb_to_ycrcb(pixel);
        ycrcb_to_rgb([lut[usize::from(y)], cr, cb])
    })
}
