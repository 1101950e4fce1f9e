//! Image enhancement CLI
//!
//! Command-line front end for the adjustment pipeline and background compositor.

use super::config::CliConfigBuilder;
use crate::{
    composite::BackgroundMode,
    config::OutputFormat,
    processor::EnhancementProcessor,
    services::{ConsoleProgressReporter, ImageIOService, OutputFormatHandler},
    tracing_config::{init_cli_tracing, spans},
    types::RgbColor,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Input extensions accepted when scanning directories
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Photo enhancement and background compositing tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "imgly-enhance")]
pub struct Cli {
    /// Input image files or directories (use "-" for stdin)
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// Output file (single input) or directory (batch). Use "-" for stdout.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Output format (defaults to the extension of a single output file, else PNG)
    #[arg(short, long, value_enum)]
    pub format: Option<CliOutputFormat>,

    /// JPEG quality (0-100)
    #[arg(long, default_value_t = 90)]
    pub jpeg_quality: u8,

    /// Brightness factor (0.0-2.0, 1.0 = unchanged)
    #[arg(long)]
    pub brightness: Option<f32>,

    /// Contrast factor (0.0-2.0, 1.0 = unchanged)
    #[arg(long)]
    pub contrast: Option<f32>,

    /// Saturation factor (0.0-2.0, 1.0 = unchanged)
    #[arg(long)]
    pub saturation: Option<f32>,

    /// Sharpness factor (0.0-2.0, 1.0 = unchanged)
    #[arg(long)]
    pub sharpness: Option<f32>,

    /// Gamma (0.0-2.0, 1.0 = unchanged, above 1 brightens midtones)
    #[arg(long)]
    pub gamma: Option<f32>,

    /// Equalize the luma histogram
    #[arg(long)]
    pub equalize: bool,

    /// How the sharpness factor is applied
    #[arg(long, value_enum)]
    pub sharpen_mode: Option<CliSharpenMode>,

    /// Read adjustment parameters from a JSON file (flags override its values)
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Start from a named parameter preset (flags override its values)
    #[arg(long, value_enum)]
    pub preset: Option<CliPreset>,

    /// Pre-computed foreground mask (grayscale, white = keep)
    #[arg(long, value_name = "MASK")]
    pub mask: Option<PathBuf>,

    /// Solid background colour as #rrggbb (wins over --background-image)
    #[arg(long, value_name = "COLOR")]
    pub background_color: Option<RgbColor>,

    /// Background image, resized to each input
    #[arg(long, value_name = "FILE")]
    pub background_image: Option<PathBuf>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Filename pattern for directory inputs (e.g., "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Jpeg,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliSharpenMode {
    /// Scale the kernel by the factor (0 gives black)
    Kernel,
    /// Blend between original and sharpened image
    Blend,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliPreset {
    /// Slightly darker, lifted midtones, equalized
    Showcase,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;
    let _session = spans::session(&session_id, cli.input.len()).entered();

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;
    let background = CliConfigBuilder::background_mode(&cli)?;

    info!("Input(s): {}", cli.input.join(", "));
    info!(
        "Adjustments: {}",
        serde_json::to_string(&config.adjustments).unwrap_or_default()
    );
    info!("Background: {}", background.describe());

    let verbose_progress = config.verbose_progress;
    let mut processor =
        EnhancementProcessor::new(config).context("Failed to create enhancement processor")?;
    if let Some(segmenter) = CliConfigBuilder::segmenter(&cli)? {
        processor.set_segmenter(Some(Box::new(segmenter)));
    }
    if cli.verbose > 0 {
        processor = processor.with_progress_reporter(Box::new(ConsoleProgressReporter::new(verbose_progress)));
    }

    let start_time = Instant::now();
    let processed_count = process_inputs(&cli, &mut processor, &background).await?;

    info!(
        "Processed {} image(s) in {:.2}s",
        processed_count,
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

async fn process_inputs(
    cli: &Cli,
    processor: &mut EnhancementProcessor,
    background: &BackgroundMode,
) -> Result<usize> {
    if cli.input.len() == 1 && cli.input.first().is_some_and(|s| s == "-") {
        return process_stdin(cli.output.as_deref(), processor, background).await;
    }

    let all_files = collect_input_files(cli)?;
    if all_files.is_empty() {
        warn!("No supported image files found in the provided inputs");
        return Ok(0);
    }

    info!("Found {} image file(s) to process", all_files.len());

    let file_count = all_files.len();
    let output_format = processor.config().output_format;
    let output_dir = prepare_output_dir(cli, file_count)?;

    let progress_bar = if file_count > 1 {
        let pb = ProgressBar::new(file_count as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let _batch = spans::batch_processing(file_count).entered();
    let batch_start = Instant::now();
    let mut processed_count = 0;
    let mut failed_count = 0;

    for input_file in &all_files {
        if let Some(ref pb) = progress_bar {
            pb.set_message(format!("Processing {}", input_file.display()));
        }

        let output_path = match (&output_dir, file_count) {
            (Some(dir), _) => Some(generate_output_path_with_dir(input_file, dir, output_format)),
            (None, 1) => cli.output.clone().map(PathBuf::from),
            (None, _) => None,
        };
        let output_path = output_path.unwrap_or_else(|| generate_output_path(input_file, output_format));

        match process_single_file(processor, input_file, &output_path, background, cli.output.as_deref() == Some("-")) {
            Ok(()) => processed_count += 1,
            Err(e) => {
                error!("Failed to process {}: {:#}", input_file.display(), e);
                failed_count += 1;
            },
        }

        if let Some(ref pb) = progress_bar {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!("Completed! Processed: {processed_count}, Failed: {failed_count}"));
    }

    if file_count > 1 {
        let total = batch_start.elapsed().as_secs_f64();
        info!("Batch summary: {} processed, {} failed, {:.2}s total", processed_count, failed_count, total);
    }

    if processed_count == 0 && failed_count > 0 {
        anyhow::bail!("All {} input(s) failed to process", failed_count);
    }

    Ok(processed_count)
}

/// Expand files and directories into a sorted list of image paths
fn collect_input_files(cli: &Cli) -> Result<Vec<PathBuf>> {
    let mut all_files = Vec::new();

    for input in &cli.input {
        let path = PathBuf::from(input);

        if path.is_file() {
            if ImageIOService::is_supported_format(&path) {
                all_files.push(path);
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            all_files.extend(find_image_files(&path, cli.recursive, cli.pattern.as_deref())?);
        } else {
            anyhow::bail!("Input path does not exist or is not accessible: {}", path.display());
        }
    }

    all_files.sort();
    Ok(all_files)
}

/// Create (or check) the output directory for batch runs
fn prepare_output_dir(cli: &Cli, file_count: usize) -> Result<Option<PathBuf>> {
    if file_count <= 1 {
        return Ok(None);
    }

    let Some(ref output) = cli.output else {
        return Ok(None);
    };

    let output_path = PathBuf::from(output);
    if output_path.is_file() {
        anyhow::bail!("Output path exists and is a file, not a directory: {}", output_path.display());
    }
    std::fs::create_dir_all(&output_path)
        .with_context(|| format!("Failed to create output directory: {}", output_path.display()))?;
    Ok(Some(output_path))
}

fn process_single_file(
    processor: &mut EnhancementProcessor,
    input_path: &Path,
    output_path: &Path,
    background: &BackgroundMode,
    to_stdout: bool,
) -> Result<()> {
    let format = processor.config().output_format;
    let _span = spans::file_processing(input_path, &format.to_string()).entered();

    let mut result = processor
        .process_file(input_path, background)
        .with_context(|| format!("Failed to enhance {}", input_path.display()))?;

    if to_stdout {
        let bytes = processor.encode_result(&mut result)?;
        return write_stdout(&bytes);
    }

    OutputFormatHandler::warn_if_alpha_lost(&result.image, format);
    result
        .save(output_path, format, processor.config().jpeg_quality)
        .with_context(|| format!("Failed to save {}", output_path.display()))?;

    log::debug!("{}", result.timing_summary());
    Ok(())
}

/// Enhance an image read from stdin
async fn process_stdin(
    output_target: Option<&str>,
    processor: &mut EnhancementProcessor,
    background: &BackgroundMode,
) -> Result<usize> {
    info!("Reading image from stdin");

    let image = ImageIOService::load_from_reader(tokio::io::stdin())
        .await
        .context("Failed to read image from stdin")?;
    let mut result = processor
        .process_image(&image, background)
        .context("Failed to enhance stdin image")?;

    match output_target {
        None | Some("-") => {
            let bytes = processor.encode_result(&mut result)?;
            write_stdout(&bytes)?;
        },
        Some(path) => {
            let config = processor.config();
            result.save(path, config.output_format, config.jpeg_quality)?;
        },
    }

    Ok(1)
}

fn write_stdout(data: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(data)
        .context("Failed to write image data to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Find image files in a directory, optionally recursing and filtering by pattern
fn find_image_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if recursive {
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry?;
            if entry.file_type().is_file() {
                let path = entry.path();
                if is_image_file(path) && matches_pattern(path, pattern) {
                    files.push(path.to_path_buf());
                }
            }
        }
    } else {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if is_image_file(&path) && matches_pattern(&path, pattern) {
                    files.push(path);
                }
            }
        }
    }

    Ok(files)
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    let Some(pattern) = pattern else {
        return true;
    };

    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| glob::Pattern::new(pattern).is_ok_and(|p| p.matches(name)))
}

/// `<dir>/<stem>_enhanced.<ext>` next to the input
fn generate_output_path(input_path: &Path, format: OutputFormat) -> PathBuf {
    let dir = input_path.parent().unwrap_or(Path::new("."));
    generate_output_path_with_dir(input_path, dir, format)
}

fn generate_output_path_with_dir(input_path: &Path, output_dir: &Path, format: OutputFormat) -> PathBuf {
    let stem = input_path.file_stem().unwrap_or_default();
    output_dir.join(format!(
        "{}_enhanced.{}",
        stem.to_string_lossy(),
        OutputFormatHandler::get_extension(format)
    ))
}
