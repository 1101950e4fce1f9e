//! Unified enhancement processor
//!
//! `EnhancementProcessor` runs one request end to end: optional background
//! removal through a [`SegmentationAdapter`], the adjustment pipeline, then
//! compositing. The adapter is owned by the processor so a loaded model is
//! reused across requests.

use crate::{
    adjust::AdjustmentPipeline,
    composite::{BackgroundMode, Compositor},
    config::{AdjustmentParameters, EnhanceConfig, OutputFormat},
    error::{EnhanceError, Result},
    segmentation::SegmentationAdapter,
    services::{ImageIOService, OutputFormatHandler, ProcessingStage, ProgressReporter, ProgressTracker},
    types::{EnhancementResult, Image, ProcessingMetadata, ProcessingTimings},
    utils::NumericValidator,
};
use instant::Instant;
use log::{debug, info};
use std::path::Path;
use tracing::{info as trace_info, instrument, span, Level};

/// Configuration for the enhancement processor
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
    /// Adjustment factors (clamped into `[0.0, 2.0]`)
    pub adjustments: AdjustmentParameters,
    /// Output format used by `process_file` and `to_bytes` helpers
    pub output_format: OutputFormat,
    /// JPEG quality (0-100)
    pub jpeg_quality: u8,
    /// Enable debug mode (per-stage timing logs)
    pub debug: bool,
    /// Enable verbose progress reporting
    pub verbose_progress: bool,
}

impl ProcessorConfig {
    #[must_use]
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::new()
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self::from(EnhanceConfig::default())
    }
}

impl From<EnhanceConfig> for ProcessorConfig {
    fn from(config: EnhanceConfig) -> Self {
        Self {
            adjustments: config.adjustments.clamped(),
            output_format: config.output_format,
            jpeg_quality: config.jpeg_quality,
            debug: config.debug,
            verbose_progress: false,
        }
    }
}

/// Builder for `ProcessorConfig`
#[derive(Debug, Default)]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn adjustments(mut self, adjustments: AdjustmentParameters) -> Self {
        self.config.adjustments = adjustments.clamped();
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.min(100);
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    #[must_use]
    pub fn verbose_progress(mut self, verbose: bool) -> Self {
        self.config.verbose_progress = verbose;
        self
    }

    /// Build the processor configuration
    ///
    /// # Errors
    /// - `InvalidConfig` for JPEG quality above 100 (unreachable through the setters)
    pub fn build(self) -> Result<ProcessorConfig> {
        NumericValidator::validate_quality(self.config.jpeg_quality)?;
        Ok(self.config)
    }
}

/// Runs segmentation, adjustment and compositing for one image at a time
pub struct EnhancementProcessor {
    config: ProcessorConfig,
    pipeline: AdjustmentPipeline,
    segmenter: Option<Box<dyn SegmentationAdapter>>,
    progress_tracker: Option<ProgressTracker>,
}

impl EnhancementProcessor {
    /// Create a processor without a segmentation adapter
    ///
    /// # Errors
    /// - `InvalidConfig` for an out-of-range JPEG quality
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        NumericValidator::validate_quality(config.jpeg_quality)?;
        Ok(Self {
            pipeline: AdjustmentPipeline::new(config.adjustments),
            config,
            segmenter: None,
            progress_tracker: None,
        })
    }

    /// Attach a segmentation adapter; it is reused for every request
    #[must_use]
    pub fn with_segmenter(mut self, segmenter: Box<dyn SegmentationAdapter>) -> Self {
        self.set_segmenter(Some(segmenter));
        self
    }

    /// Replace (or remove) the segmentation adapter
    pub fn set_segmenter(&mut self, segmenter: Option<Box<dyn SegmentationAdapter>>) {
        if let Some(ref adapter) = segmenter {
            debug!("Using segmentation adapter '{}'", adapter.name());
        }
        self.segmenter = segmenter;
    }

    /// Report progress through `reporter`
    #[must_use]
    pub fn with_progress_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.progress_tracker = Some(ProgressTracker::new(reporter));
        self
    }

    /// Swap the adjustment parameters used for subsequent requests
    pub fn set_adjustments(&mut self, adjustments: AdjustmentParameters) {
        self.pipeline = AdjustmentPipeline::new(adjustments);
        self.config.adjustments = *self.pipeline.params();
    }

    #[must_use]
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    #[must_use]
    pub fn has_segmenter(&self) -> bool {
        self.segmenter.is_some()
    }

    fn report(&mut self, stage: ProcessingStage) {
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.report_stage(stage);
        }
    }

    fn report_error(&self, error: &EnhanceError) {
        if let Some(ref tracker) = self.progress_tracker {
            tracker.report_error(&error.to_string());
        }
    }

    /// Enhance a decoded image
    ///
    /// # Errors
    /// - `Segmentation` when the adapter fails
    /// - `DimensionMismatch` when the adapter output or the background
    ///   cannot be matched to the input size
    #[instrument(
        skip(self, image, background),
        fields(
            dimensions = %format!("{}x{}", image.width(), image.height()),
            background = %background.describe(),
            segmenter = self.segmenter.as_ref().map_or("none", |s| s.name())
        )
    )]
    pub fn process_image(&mut self, image: &Image, background: &BackgroundMode) -> Result<EnhancementResult> {
        self.begin_request();
        self.process_decoded(image, background)
    }

    /// Restart progress tracking; called once per request before any stage is reported
    fn begin_request(&mut self) {
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.reset();
        }
    }

    fn process_decoded(&mut self, image: &Image, background: &BackgroundMode) -> Result<EnhancementResult> {
        match self.run(image, background) {
            Ok(result) => Ok(result),
            Err(e) => {
                self.report_error(&e);
                Err(e)
            },
        }
    }

    fn run(&mut self, image: &Image, background: &BackgroundMode) -> Result<EnhancementResult> {
        let total_start = Instant::now();
        let original_dimensions = image.dimensions();
        let mut timings = ProcessingTimings::default();

        trace_info!(
            stages = self.pipeline.planned_stages().len(),
            segmented = self.segmenter.is_some(),
            "Starting enhancement"
        );

        let foreground = if self.segmenter.is_some() {
            self.report(ProcessingStage::Segmentation);
            let _span = span!(Level::INFO, "segmentation").entered();
            let start = Instant::now();
            let segmented = self.segment(image)?;
            timings.segmentation_ms = start.elapsed().as_millis() as u64;
            Some(segmented)
        } else {
            None
        };

        self.report(ProcessingStage::Adjusting);
        let run = {
            let _span = span!(
                Level::DEBUG,
                "adjustment",
                stages = %self.pipeline.planned_stages().len()
            )
            .entered();
            let start = Instant::now();
            let run = self.pipeline.run(foreground.as_ref().unwrap_or(image))?;
            timings.adjustment_ms = start.elapsed().as_millis() as u64;
            run
        };

        if self.config.debug {
            for stage in &run.stages {
                info!("  {}: {}ms", stage.stage, stage.duration_ms);
            }
        }

        let mut metadata = ProcessingMetadata::new(background.describe());
        metadata.stages_applied = run.applied();
        metadata.segmented = foreground.is_some();
        timings.stages = run.stages;

        let final_image = if background.is_none() {
            run.image
        } else {
            let description = background.describe();
            if let Some(ref mut tracker) = self.progress_tracker {
                tracker.report_stage_with_description(
                    ProcessingStage::Compositing,
                    format!("Compositing over {}", description),
                );
            }
            let _span = span!(Level::DEBUG, "compositing", background = %description).entered();
            let start = Instant::now();
            let composited = Compositor::composite(&run.image, None, background)?;
            timings.compositing_ms = start.elapsed().as_millis() as u64;
            composited
        };

        timings.total_ms = total_start.elapsed().as_millis() as u64;
        metadata.timings = timings.clone();

        let mut result = EnhancementResult::new(final_image, original_dimensions, metadata);
        result.foreground = foreground;

        self.report(ProcessingStage::Completed);
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.report_completion(timings);
            debug!("Request finished {}ms after it started", tracker.elapsed_ms());
        }

        debug!("{}", result.timing_summary());
        Ok(result)
    }

    fn segment(&mut self, image: &Image) -> Result<Image> {
        let Some(segmenter) = self.segmenter.as_mut() else {
            return Err(EnhanceError::segmentation("No segmentation adapter configured"));
        };

        let foreground = segmenter.segment(image)?;
        if foreground.dimensions() != image.dimensions() {
            return Err(EnhanceError::dimension_mismatch(
                format!("segmentation output of '{}'", segmenter.name()),
                image.dimensions(),
                foreground.dimensions(),
            ));
        }
        if !foreground.has_alpha() {
            log::warn!(
                "Segmentation adapter '{}' returned an image without alpha",
                segmenter.name()
            );
        }
        Ok(foreground)
    }

    /// Decode and enhance an encoded image
    ///
    /// # Errors
    /// - `Decode` for malformed input
    /// - Any error from [`EnhancementProcessor::process_image`]
    pub fn process_bytes(&mut self, bytes: &[u8], background: &BackgroundMode) -> Result<EnhancementResult> {
        self.begin_request();
        self.report(ProcessingStage::Decoding);
        let start = Instant::now();
        let image = match ImageIOService::load_from_bytes(bytes) {
            Ok(image) => image,
            Err(e) => {
                self.report_error(&e);
                return Err(e);
            },
        };
        let decode_ms = start.elapsed().as_millis() as u64;

        let mut result = self.process_decoded(&image, background)?;
        result.metadata.timings.decode_ms = decode_ms;
        result.metadata.timings.total_ms += decode_ms;
        Ok(result)
    }

    /// Load, enhance and return the result for a file on disk
    ///
    /// # Errors
    /// - `Io`/`Decode` when the file cannot be read
    /// - Any error from [`EnhancementProcessor::process_image`]
    pub fn process_file<P: AsRef<Path>>(&mut self, path: P, background: &BackgroundMode) -> Result<EnhancementResult> {
        let path = path.as_ref();
        self.begin_request();
        self.report(ProcessingStage::Decoding);
        let start = Instant::now();
        let image = match ImageIOService::load_image(path) {
            Ok(image) => image,
            Err(e) => {
                self.report_error(&e);
                return Err(e);
            },
        };
        let decode_ms = start.elapsed().as_millis() as u64;

        let mut result = self.process_decoded(&image, background)?;
        result.metadata.timings.decode_ms = decode_ms;
        result.metadata.timings.total_ms += decode_ms;
        result.input_path = Some(path.display().to_string());
        Ok(result)
    }

    /// Encode a result with the configured output format and quality
    ///
    /// # Errors
    /// - Encoder failures
    pub fn encode_result(&mut self, result: &mut EnhancementResult) -> Result<Vec<u8>> {
        self.report(ProcessingStage::Encoding);
        OutputFormatHandler::warn_if_alpha_lost(&result.image, self.config.output_format);
        let start = Instant::now();
        let bytes = result.to_bytes(self.config.output_format, self.config.jpeg_quality)?;
        result.metadata.timings.encode_ms = Some(start.elapsed().as_millis() as u64);
        Ok(bytes)
    }
}

impl std::fmt::Debug for EnhancementProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnhancementProcessor")
            .field("config", &self.config)
            .field(
                "segmenter",
                &self.segmenter.as_ref().map(|segmenter| segmenter.name().to_string()),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adjust::AdjustmentStage,
        segmentation::MaskSegmenter,
        services::ProgressUpdate,
        types::{AlphaMask, RgbColor},
    };
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct StageLog(Arc<Mutex<Vec<ProcessingStage>>>);

    impl ProgressReporter for StageLog {
        fn report_progress(&self, update: ProgressUpdate) {
            self.0.lock().unwrap().push(update.stage);
        }

        fn report_completion(&self, _timings: ProcessingTimings) {}

        fn report_error(&self, stage: ProcessingStage, _error: &str) {
            self.0.lock().unwrap().push(stage);
        }
    }

    /// Keeps full updates and stalls while the decode stage is reported
    #[derive(Default, Clone)]
    struct SlowDecodeLog(Arc<Mutex<Vec<ProgressUpdate>>>);

    impl ProgressReporter for SlowDecodeLog {
        fn report_progress(&self, update: ProgressUpdate) {
            if update.stage == ProcessingStage::Decoding {
                std::thread::sleep(std::time::Duration::from_millis(40));
            }
            self.0.lock().unwrap().push(update);
        }

        fn report_completion(&self, _timings: ProcessingTimings) {}

        fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
    }

    struct ShrinkingSegmenter;

    impl SegmentationAdapter for ShrinkingSegmenter {
        fn segment(&mut self, _image: &Image) -> Result<Image> {
            Ok(Image::solid(1, 1, RgbColor::new(0, 0, 0)))
        }

        fn name(&self) -> &str {
            "shrinking"
        }
    }

    fn half_mask(width: u32, height: u32) -> AlphaMask {
        let data = (0..height)
            .flat_map(|_| (0..width).map(move |x| if x < width / 2 { 255 } else { 0 }))
            .collect();
        AlphaMask::new(data, (width, height))
    }

    #[test]
    fn test_config_builder() {
        let config = ProcessorConfig::builder()
            .adjustments(AdjustmentParameters::builder().contrast(1.4).build())
            .output_format(OutputFormat::Jpeg)
            .jpeg_quality(80)
            .debug(true)
            .build()
            .unwrap();
        assert_eq!(config.output_format, OutputFormat::Jpeg);
        assert_eq!(config.jpeg_quality, 80);

        // Same clamping policy as `EnhanceConfigBuilder`
        let config = ProcessorConfig::builder().jpeg_quality(101).build().unwrap();
        assert_eq!(config.jpeg_quality, 100);

        let invalid = ProcessorConfig {
            jpeg_quality: 150,
            ..ProcessorConfig::default()
        };
        assert!(EnhancementProcessor::new(invalid).is_err());
    }

    #[test]
    fn test_identity_without_background_returns_input() {
        let mut processor = EnhancementProcessor::new(ProcessorConfig::default()).unwrap();
        let image = Image::solid(4, 4, RgbColor::new(12, 34, 56));
        let result = processor.process_image(&image, &BackgroundMode::None).unwrap();
        assert_eq!(result.image, image);
        assert!(result.metadata.stages_applied.is_empty());
        assert!(!result.metadata.segmented);
        assert!(result.foreground.is_none());
    }

    #[test]
    fn test_segment_adjust_composite() {
        let config = ProcessorConfig::builder()
            .adjustments(AdjustmentParameters::builder().brightness(0.5).build())
            .build()
            .unwrap();
        let reporter = StageLog::default();
        let mut processor = EnhancementProcessor::new(config)
            .unwrap()
            .with_segmenter(Box::new(MaskSegmenter::new(half_mask(4, 2))))
            .with_progress_reporter(Box::new(reporter.clone()));
        assert!(processor.has_segmenter());

        let image = Image::solid(4, 2, RgbColor::new(200, 100, 50));
        let background = BackgroundMode::SolidColor(RgbColor::new(0, 0, 255));
        let result = processor.process_image(&image, &background).unwrap();

        assert!(result.metadata.segmented);
        assert_eq!(result.metadata.stages_applied, vec![AdjustmentStage::Brightness]);
        assert!(!result.image.has_alpha());

        let Image::Rgb(buffer) = &result.image else {
            panic!("expected flattened output");
        };
        assert_eq!(buffer.get_pixel(0, 0).0, [100, 50, 25]);
        assert_eq!(buffer.get_pixel(3, 1).0, [0, 0, 255]);

        let foreground = result.foreground.as_ref().unwrap();
        assert!(foreground.has_alpha());

        let stages = reporter.0.lock().unwrap();
        assert_eq!(
            *stages,
            vec![
                ProcessingStage::Segmentation,
                ProcessingStage::Adjusting,
                ProcessingStage::Compositing,
                ProcessingStage::Completed
            ]
        );
    }

    #[test]
    fn test_compositing_reports_background_and_is_skipped_without_one() {
        let reporter = SlowDecodeLog::default();
        let mut processor = EnhancementProcessor::new(ProcessorConfig::default())
            .unwrap()
            .with_progress_reporter(Box::new(reporter.clone()));
        let image = Image::solid(2, 2, RgbColor::new(1, 2, 3));

        processor
            .process_image(&image, &BackgroundMode::SolidColor(RgbColor::new(0, 249, 0)))
            .unwrap();
        let compositing: Vec<String> = reporter
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.stage == ProcessingStage::Compositing)
            .map(|u| u.description.clone())
            .collect();
        assert_eq!(compositing, vec!["Compositing over color #00f900".to_string()]);

        reporter.0.lock().unwrap().clear();
        let result = processor.process_image(&image, &BackgroundMode::None).unwrap();
        assert_eq!(result.image, image);
        assert_eq!(result.metadata.timings.compositing_ms, 0);
        assert!(reporter
            .0
            .lock()
            .unwrap()
            .iter()
            .all(|u| u.stage != ProcessingStage::Compositing));
    }

    #[test]
    fn test_progress_clock_covers_decoding() {
        let image = Image::solid(2, 2, RgbColor::new(9, 9, 9));
        let png = ImageIOService::encode(&image, OutputFormat::Png, 100).unwrap();

        let reporter = SlowDecodeLog::default();
        let mut processor = EnhancementProcessor::new(ProcessorConfig::default())
            .unwrap()
            .with_progress_reporter(Box::new(reporter.clone()));
        processor.process_bytes(&png, &BackgroundMode::None).unwrap();

        let updates = reporter.0.lock().unwrap();
        assert_eq!(updates.first().map(|u| u.stage), Some(ProcessingStage::Decoding));
        let completed = updates
            .iter()
            .find(|u| u.stage == ProcessingStage::Completed)
            .unwrap();
        assert!(completed.elapsed_ms >= 40, "elapsed {}ms", completed.elapsed_ms);
    }

    #[test]
    fn test_adapter_size_mismatch_is_reported() {
        let reporter = StageLog::default();
        let mut processor = EnhancementProcessor::new(ProcessorConfig::default())
            .unwrap()
            .with_segmenter(Box::new(ShrinkingSegmenter))
            .with_progress_reporter(Box::new(reporter.clone()));

        let image = Image::solid(4, 4, RgbColor::new(1, 1, 1));
        let err = processor.process_image(&image, &BackgroundMode::None).unwrap_err();
        assert!(matches!(err, EnhanceError::DimensionMismatch { .. }));

        let stages = reporter.0.lock().unwrap();
        assert_eq!(stages.last(), Some(&ProcessingStage::Segmentation));
    }

    #[test]
    fn test_process_bytes_records_decode_and_encode() {
        let image = Image::solid(3, 3, RgbColor::new(90, 90, 90));
        let png = ImageIOService::encode(&image, OutputFormat::Png, 100).unwrap();

        let mut processor = EnhancementProcessor::new(ProcessorConfig::default()).unwrap();
        processor.set_adjustments(AdjustmentParameters::builder().gamma(2.0).build());
        let mut result = processor.process_bytes(&png, &BackgroundMode::None).unwrap();
        assert_eq!(result.metadata.stages_applied, vec![AdjustmentStage::Gamma]);

        let bytes = processor.encode_result(&mut result).unwrap();
        assert!(!bytes.is_empty());
        assert!(result.timings().encode_ms.is_some());

        let err = processor.process_bytes(b"garbage", &BackgroundMode::None).unwrap_err();
        assert!(matches!(err, EnhanceError::Decode(_)));
    }
}
