//! Deterministic adjustment pipeline
//!
//! Stages run in a fixed order: brightness, contrast, saturation, sharpness,
//! gamma, then histogram equalization. A stage whose factor is neutral (`1.0`)
//! is skipped, as is equalization when disabled, so the identity parameter set
//! returns the input unchanged.

pub mod color;
pub mod convolve;
pub mod enhance;
pub mod gamma;
pub mod histogram;

use crate::{
    config::{AdjustmentParameters, NEUTRAL_FACTOR},
    error::Result,
    types::{Image, StageTiming},
};
use instant::Instant;
use serde::{Deserialize, Serialize};
use tracing::{span, Level};

/// One step of the adjustment pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentStage {
    Brightness,
    Contrast,
    Saturation,
    Sharpness,
    Gamma,
    Equalize,
}

impl AdjustmentStage {
    /// All stages in execution order
    pub const ORDER: [Self; 6] = [
        Self::Brightness,
        Self::Contrast,
        Self::Saturation,
        Self::Sharpness,
        Self::Gamma,
        Self::Equalize,
    ];
}

impl std::fmt::Display for AdjustmentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturation => "saturation",
            Self::Sharpness => "sharpness",
            Self::Gamma => "gamma",
            Self::Equalize => "equalize",
        };
        write!(f, "{}", name)
    }
}

/// Output of a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Adjusted image
    pub image: Image,
    /// Stages that actually ran, with their durations
    pub stages: Vec<StageTiming>,
}

impl PipelineRun {
    /// Stages that ran, in order
    #[must_use]
    pub fn applied(&self) -> Vec<AdjustmentStage> {
        self.stages.iter().map(|timing| timing.stage).collect()
    }
}

/// Runs the configured stages over an image
#[derive(Debug, Clone)]
pub struct AdjustmentPipeline {
    params: AdjustmentParameters,
}

impl AdjustmentPipeline {
    /// Create a pipeline; out-of-range factors are clamped into `[0.0, 2.0]`
    #[must_use]
    pub fn new(params: AdjustmentParameters) -> Self {
        Self {
            params: params.clamped(),
        }
    }

    /// Effective (clamped) parameters
    #[must_use]
    pub fn params(&self) -> &AdjustmentParameters {
        &self.params
    }

    /// Stages that will run for the current parameters, in order
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn planned_stages(&self) -> Vec<AdjustmentStage> {
        AdjustmentStage::ORDER
            .into_iter()
            .filter(|stage| match self.factor(*stage) {
                Some(factor) => factor != NEUTRAL_FACTOR,
                None => self.params.equalize_histogram,
            })
            .collect()
    }

    fn factor(&self, stage: AdjustmentStage) -> Option<f32> {
        match stage {
            AdjustmentStage::Brightness => Some(self.params.brightness),
            AdjustmentStage::Contrast => Some(self.params.contrast),
            AdjustmentStage::Saturation => Some(self.params.saturation),
            AdjustmentStage::Sharpness => Some(self.params.sharpness),
            AdjustmentStage::Gamma => Some(self.params.gamma),
            AdjustmentStage::Equalize => None,
        }
    }

    /// Run every planned stage over `image`
    ///
    /// # Errors
    /// - `DimensionMismatch` if a stage produces a raster of the wrong size
    pub fn run(&self, image: &Image) -> Result<PipelineRun> {
        let planned = self.planned_stages();
        if planned.is_empty() {
            log::trace!("All adjustment factors neutral, returning input unchanged");
            return Ok(PipelineRun {
                image: image.clone(),
                stages: Vec::new(),
            });
        }

        let mut current = image.clone();
        let mut stages = Vec::with_capacity(planned.len());

        for stage in planned {
            let _span = span!(
                Level::DEBUG,
                "adjust_stage",
                stage = %stage,
                factor = ?self.factor(stage)
            )
            .entered();

            let start = Instant::now();
            current = self.apply_stage(stage, &current)?;
            let duration_ms = start.elapsed().as_millis() as u64;

            log::debug!("{} stage finished in {}ms", stage, duration_ms);
            stages.push(StageTiming { stage, duration_ms });
        }

        Ok(PipelineRun {
            image: current,
            stages,
        })
    }

    fn apply_stage(&self, stage: AdjustmentStage, image: &Image) -> Result<Image> {
        let p = &self.params;
        let adjusted = match stage {
            AdjustmentStage::Brightness => enhance::brightness(image, p.brightness),
            AdjustmentStage::Contrast => enhance::contrast(image, p.contrast),
            AdjustmentStage::Saturation => color::saturation(image, p.saturation),
            AdjustmentStage::Sharpness => convolve::sharpen(image, p.sharpness, p.sharpen_mode)?,
            AdjustmentStage::Gamma => gamma::apply_gamma(image, p.gamma),
            AdjustmentStage::Equalize => histogram::equalize(image),
        };
        Ok(adjusted)
    }
}

/// Apply a parameter set to an image in one call
///
/// # Errors
/// - Propagates stage failures from [`AdjustmentPipeline::run`]
pub fn apply(image: &Image, params: &AdjustmentParameters) -> Result<Image> {
    AdjustmentPipeline::new(*params).run(image).map(|run| run.image)
}
