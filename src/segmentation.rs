//! Segmentation adapter seam
//!
//! Background removal itself is provided by an external model. The pipeline
//! only depends on [`SegmentationAdapter`], which turns an image into an
//! RGBA foreground whose alpha channel marks the subject.

use crate::{
    error::{EnhanceError, Result},
    types::{AlphaMask, Image},
};

/// Produces a background-removed foreground for an image
pub trait SegmentationAdapter: Send {
    /// Return an RGBA image of the same size as `image`, transparent where
    /// the background was removed
    ///
    /// # Errors
    /// - `Segmentation` when the underlying model fails
    fn segment(&mut self, image: &Image) -> Result<Image>;

    /// Adapter name for logs
    fn name(&self) -> &str;
}

/// Adapter that applies a pre-computed alpha mask
///
/// The mask is resized to the input with Lanczos resampling when needed.
#[derive(Debug, Clone)]
pub struct MaskSegmenter {
    mask: AlphaMask,
}

impl MaskSegmenter {
    #[must_use]
    pub fn new(mask: AlphaMask) -> Self {
        Self { mask }
    }

    /// Load a mask from a grayscale (or any) image file; luminance becomes alpha
    ///
    /// # Errors
    /// - File read or decode failures
    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|e| {
            EnhanceError::decode(format!("Failed to load mask '{}': {}", path.display(), e))
        })?;
        Ok(Self::new(AlphaMask::from_image(&decoded.to_luma8())))
    }

    #[must_use]
    pub fn mask(&self) -> &AlphaMask {
        &self.mask
    }
}

impl SegmentationAdapter for MaskSegmenter {
    fn segment(&mut self, image: &Image) -> Result<Image> {
        let (width, height) = image.dimensions();
        if self.mask.dimensions == (width, height) {
            return image.with_alpha(&self.mask);
        }

        if width == 0 || height == 0 {
            return Err(EnhanceError::segmentation("Cannot segment an empty image"));
        }

        log::debug!(
            "Resizing mask from {}x{} to {}x{}",
            self.mask.dimensions.0,
            self.mask.dimensions.1,
            width,
            height
        );
        let resized = self.mask.resize(width, height)?;
        image.with_alpha(&resized)
    }

    fn name(&self) -> &str {
        "precomputed-mask"
    }
}
