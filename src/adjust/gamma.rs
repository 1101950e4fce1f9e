//! Gamma correction through a 256-entry lookup table

use crate::{types::Image, utils::NumericValidator};

/// Smallest gamma accepted by the table builder; lower values are floored here
pub const MIN_GAMMA: f32 = 0.01;

/// Build the gamma lookup table `v -> 255 * (v / 255)^(1 / gamma)`
///
/// Gamma above one brightens midtones, below one darkens them. Values below
/// [`MIN_GAMMA`] (including zero) are floored to it. Entries are truncated,
/// and a neutral gamma yields the exact identity table.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn gamma_table(gamma: f32) -> [u8; 256] {
    let mut table = [0u8; 256];
    let gamma = if gamma.is_nan() { 1.0 } else { gamma.max(MIN_GAMMA) };
    if gamma == 1.0 {
        for (value, entry) in table.iter_mut().enumerate() {
            *entry = value as u8;
        }
        return table;
    }

    let inverse = 1.0 / f64::from(gamma);
    for (value, entry) in table.iter_mut().enumerate() {
        let normalized = value as f64 / 255.0;
        *entry = NumericValidator::truncate_u8(normalized.powf(inverse) * 255.0);
    }
    table
}

/// Apply gamma correction to the colour channels
#[must_use]
pub fn apply_gamma(image: &Image, gamma: f32) -> Image {
    let table = gamma_table(gamma);
    image.map_rgb(|pixel| pixel.map(|sample| table[usize::from(sample)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RgbColor;

    #[test]
    fn test_unit_gamma_is_identity_table() {
        let table = gamma_table(1.0);
        for (value, entry) in table.iter().enumerate() {
            assert_eq!(usize::from(*entry), value);
        }
    }

    #[test]
    fn test_table_is_monotonic_with_fixed_endpoints() {
        for gamma in [0.0, 0.25, 0.5, 1.29, 2.0] {
            let table = gamma_table(gamma);
            assert_eq!(table[0], 0);
            assert_eq!(table[255], 255);
            assert!(table.windows(2).all(|pair| pair[0] <= pair[1]), "gamma {}", gamma);
        }
    }

    #[test]
    fn test_gamma_direction() {
        // 128/255 ^ (1/2) * 255 = 180.67
        assert_eq!(gamma_table(2.0)[128], 180);
        // 128/255 ^ 2 * 255 = 64.25
        assert_eq!(gamma_table(0.5)[128], 64);
    }

    #[test]
    fn test_showcase_gamma_truncates() {
        let table = gamma_table(1.29);
        let inverse = 1.0 / f64::from(1.29f32);
        for (value, entry) in table.iter().enumerate() {
            let expected = ((value as f64 / 255.0).powf(inverse) * 255.0).floor() as u8;
            assert_eq!(*entry, expected, "level {}", value);
        }
        // 64/255 ^ (1/1.29) * 255 = 87.8
        assert_eq!(table[64], 87);
    }

    #[test]
    fn test_zero_gamma_is_floored() {
        assert_eq!(gamma_table(0.0), gamma_table(MIN_GAMMA));
        let table = gamma_table(0.0);
        assert!(table[..=128].iter().all(|&v| v == 0));
        assert_eq!(table[255], 255);
    }

    #[test]
    fn test_apply_gamma_uses_table() {
        let image = Image::solid(2, 2, RgbColor::new(128, 0, 255));
        let out = apply_gamma(&image, 2.0);
        assert!(out.as_raw().chunks_exact(3).all(|p| p == [180, 0, 255]));
        assert_eq!(apply_gamma(&image, 1.0), image);
    }
}
