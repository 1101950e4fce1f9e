//! Numeric validation utilities
//!
//! Range checks and clamping for adjustment factors and encoder settings.

use crate::error::{EnhanceError, Result};

/// Validator for numeric parameters
pub struct NumericValidator;

impl NumericValidator {
    /// Validate that a factor is finite and within `[min, max]`
    ///
    /// # Errors
    /// - `ParameterOutOfRange` for non-finite or out-of-range values
    pub fn validate_factor(value: f32, min: f32, max: f32, name: &str) -> Result<f32> {
        if !value.is_finite() || value < min || value > max {
            return Err(EnhanceError::parameter_out_of_range(name, value, min, max));
        }
        Ok(value)
    }

    /// Clamp a factor into `[min, max]`, mapping non-finite input to `fallback`
    #[must_use]
    pub fn clamp_factor(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
        if value.is_finite() {
            Self::clamp_to_range(value, min, max)
        } else {
            fallback
        }
    }

    /// Validate quality setting (0-100)
    ///
    /// # Errors
    /// - `InvalidConfig` for values above 100
    pub fn validate_quality(value: u8) -> Result<u8> {
        if value > 100 {
            return Err(EnhanceError::invalid_config(format!(
                "Quality must be between 0 and 100, got {}",
                value
            )));
        }
        Ok(value)
    }

    /// Validate and clamp a value to a range
    pub fn clamp_to_range<T>(value: T, min: T, max: T) -> T
    where
        T: PartialOrd + Copy,
    {
        if value < min {
            min
        } else if value > max {
            max
        } else {
            value
        }
    }

    /// Round and saturate a floating point sample into the 8-bit range
    #[must_use]
    pub fn saturate_u8(value: f32) -> u8 {
        if value.is_nan() {
            0
        } else {
            value.round().clamp(0.0, 255.0) as u8
        }
    }

    /// Saturate into the 8-bit range, then drop the fractional part
    #[must_use]
    pub fn truncate_u8(value: f64) -> u8 {
        if value.is_nan() {
            0
        } else {
            value.clamp(0.0, 255.0) as u8
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_factor() {
        assert_eq!(NumericValidator::validate_factor(1.5, 0.0, 2.0, "brightness").unwrap(), 1.5);
        assert!(NumericValidator::validate_factor(0.0, 0.0, 2.0, "brightness").is_ok());
        assert!(NumericValidator::validate_factor(2.0, 0.0, 2.0, "brightness").is_ok());

        let err = NumericValidator::validate_factor(2.5, 0.0, 2.0, "contrast").unwrap_err();
        assert!(matches!(err, EnhanceError::ParameterOutOfRange { .. }));
        assert!(NumericValidator::validate_factor(-0.1, 0.0, 2.0, "contrast").is_err());
        assert!(NumericValidator::validate_factor(f32::NAN, 0.0, 2.0, "gamma").is_err());
    }

    #[test]
    fn test_clamp_factor() {
        assert_eq!(NumericValidator::clamp_factor(3.0, 0.0, 2.0, 1.0), 2.0);
        assert_eq!(NumericValidator::clamp_factor(-1.0, 0.0, 2.0, 1.0), 0.0);
        assert_eq!(NumericValidator::clamp_factor(0.7, 0.0, 2.0, 1.0), 0.7);
        assert_eq!(NumericValidator::clamp_factor(f32::INFINITY, 0.0, 2.0, 1.0), 1.0);
        assert_eq!(NumericValidator::clamp_factor(f32::NAN, 0.0, 2.0, 1.0), 1.0);
    }

    #[test]
    fn test_validate_quality() {
        assert!(NumericValidator::validate_quality(0).is_ok());
        assert!(NumericValidator::validate_quality(100).is_ok());
        assert!(NumericValidator::validate_quality(101).is_err());
    }

    #[test]
    fn test_saturate_u8() {
        assert_eq!(NumericValidator::saturate_u8(-12.0), 0);
        assert_eq!(NumericValidator::saturate_u8(127.5), 128);
        assert_eq!(NumericValidator::saturate_u8(300.0), 255);
        assert_eq!(NumericValidator::saturate_u8(f32::NAN), 0);
    }

    #[test]
    fn test_truncate_u8() {
        assert_eq!(NumericValidator::truncate_u8(-0.5), 0);
        assert_eq!(NumericValidator::truncate_u8(82.82), 82);
        assert_eq!(NumericValidator::truncate_u8(254.999), 254);
        assert_eq!(NumericValidator::truncate_u8(1e9), 255);
        assert_eq!(NumericValidator::truncate_u8(f64::NAN), 0);
    }
}
