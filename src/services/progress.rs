//! Progress reporting service
//!
//! Frontends plug their own [`ProgressReporter`] into the processor; the
//! library ships a silent reporter and one that logs.

use crate::types::ProcessingTimings;
use instant::Instant;

/// Phases of a single enhancement request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Loading and decoding the input
    Decoding,
    /// Running the segmentation adapter
    Segmentation,
    /// Running the adjustment pipeline
    Adjusting,
    /// Placing the foreground over the background
    Compositing,
    /// Encoding the final image
    Encoding,
    /// Request finished
    Completed,
}

impl ProcessingStage {
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Decoding => "Decoding input image",
            Self::Segmentation => "Removing background",
            Self::Adjusting => "Applying adjustments",
            Self::Compositing => "Compositing background",
            Self::Encoding => "Encoding output",
            Self::Completed => "Processing completed",
        }
    }

    /// Rough share of the request finished once this stage starts
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            Self::Decoding => 5,
            Self::Segmentation => 20,
            Self::Adjusting => 50,
            Self::Compositing => 85,
            Self::Encoding => 95,
            Self::Completed => 100,
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    pub description: String,
    /// Elapsed time since the request started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        Self::with_description(stage, stage.description().to_string(), start_time)
    }

    #[must_use]
    pub fn with_description(stage: ProcessingStage, description: String, start_time: Instant) -> Self {
        Self {
            progress: stage.progress_percentage(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            stage,
            description,
        }
    }
}

/// Receives progress events from the processor
pub trait ProgressReporter: Send + Sync {
    fn report_progress(&self, update: ProgressUpdate);

    /// Called once with the final timings of a successful request
    fn report_completion(&self, timings: ProcessingTimings);

    fn report_error(&self, stage: ProcessingStage, error: &str);
}

/// Discards every event
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: ProcessingTimings) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Logs progress through the `log` facade
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            log::info!(
                "[{}%] {} ({}ms elapsed)",
                update.progress,
                update.description,
                update.elapsed_ms
            );
        } else {
            log::info!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        log::info!("Enhancement completed in {}ms", timings.total_ms);

        if self.verbose {
            log::info!("  Segmentation: {}ms", timings.segmentation_ms);
            log::info!("  Adjustments: {}ms", timings.adjustment_ms);
            for stage in &timings.stages {
                log::info!("    {}: {}ms", stage.stage, stage.duration_ms);
            }
            log::info!("  Compositing: {}ms", timings.compositing_ms);
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        log::error!("Error during {}: {}", stage.description(), error);
    }
}

/// Tracks the current stage and elapsed time for one request
pub struct ProgressTracker {
    reporter: Box<dyn ProgressReporter>,
    start_time: Instant,
    current_stage: Option<ProcessingStage>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(reporter: Box<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            current_stage: None,
        }
    }

    #[must_use]
    pub fn no_op() -> Self {
        Self::new(Box::new(NoOpProgressReporter))
    }

    #[must_use]
    pub fn console(verbose: bool) -> Self {
        Self::new(Box::new(ConsoleProgressReporter::new(verbose)))
    }

    /// Restart the clock for a new request
    pub fn reset(&mut self) {
        self.start_time = Instant::now();
        self.current_stage = None;
    }

    pub fn report_stage(&mut self, stage: ProcessingStage) {
        self.current_stage = Some(stage);
        self.reporter
            .report_progress(ProgressUpdate::new(stage, self.start_time));
    }

    pub fn report_stage_with_description(&mut self, stage: ProcessingStage, description: String) {
        self.current_stage = Some(stage);
        self.reporter
            .report_progress(ProgressUpdate::with_description(stage, description, self.start_time));
    }

    pub fn report_completion(&mut self, timings: ProcessingTimings) {
        self.current_stage = Some(ProcessingStage::Completed);
        self.reporter.report_completion(timings);
    }

    /// Report an error against the current stage (decoding if none started)
    pub fn report_error(&self, error: &str) {
        let stage = self.current_stage.unwrap_or(ProcessingStage::Decoding);
        self.reporter.report_error(stage, error);
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("current_stage", &self.current_stage)
            .finish_non_exhaustive()
    }
}
