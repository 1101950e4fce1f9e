//! IMG.LY image enhancement CLI
//!
//! Applies brightness, contrast, saturation, sharpness, gamma and histogram
//! adjustments, and composites background-removed photos onto new backgrounds.

#[cfg(feature = "cli")]
use imgly_enhance::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
