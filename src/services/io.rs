//! Image I/O operations service
//!
//! Decoding and encoding live here so the adjustment and compositing code
//! only ever sees decoded [`Image`] values.

use crate::{
    config::OutputFormat,
    error::{EnhanceError, Result},
    services::OutputFormatHandler,
    types::Image,
};
use image::{codecs::jpeg::JpegEncoder, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// Extension-based detection is tried first, then the content is sniffed.
    ///
    /// # Errors
    /// - `Io` when the file does not exist or cannot be read
    /// - `Decode` when neither detection method yields an image
    ///
    /// # Examples
    /// ```rust,no_run
    /// use imgly_enhance::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("portrait.jpg")?;
    /// println!("{}x{}", image.width(), image.height());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Image> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(EnhanceError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(decoded) => Ok(Image::from_dynamic(decoded)),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );

                let data = std::fs::read(path_ref)
                    .map_err(|io_err| EnhanceError::file_io_error("read image data", path_ref, &io_err))?;

                Self::load_from_bytes(&data).map_err(|content_err| {
                    EnhanceError::decode(format!(
                        "Failed to load '{}' ({} bytes): {}; {}",
                        path_ref.display(),
                        data.len(),
                        e,
                        content_err
                    ))
                })
            },
        }
    }

    /// Decode an image held in memory
    ///
    /// # Errors
    /// - `Decode` for empty, truncated or unrecognised data
    pub fn load_from_bytes(bytes: &[u8]) -> Result<Image> {
        if bytes.is_empty() {
            return Err(EnhanceError::decode("Input contains no data"));
        }

        image::load_from_memory(bytes)
            .map(Image::from_dynamic)
            .map_err(|e| EnhanceError::decode(format!("Failed to decode image from bytes: {}", e)))
    }

    /// Read an image from an async reader and decode it
    ///
    /// # Errors
    /// - `Io` when reading from the stream fails
    /// - `Decode` when the data is not a supported image
    pub async fn load_from_reader<R: tokio::io::AsyncRead + Unpin>(mut reader: R) -> Result<Image> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await?;
        Self::load_from_bytes(&buffer)
    }

    /// Encode an image in memory
    ///
    /// JPEG output drops the alpha channel; quality is clamped into `[1, 100]`.
    ///
    /// # Errors
    /// - Encoder failures
    pub fn encode(image: &Image, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        match format {
            OutputFormat::Png => {
                image.to_dynamic().write_to(&mut cursor, ImageFormat::Png)?;
            },
            OutputFormat::Jpeg => {
                if image.has_alpha() {
                    log::debug!("Dropping alpha channel for JPEG output");
                }
                let rgb = OutputFormatHandler::prepare(image, format).to_rgb8();
                let mut encoder = JpegEncoder::new_with_quality(&mut cursor, quality.clamp(1, 100));
                encoder.encode_image(&rgb)?;
            },
        }

        Ok(buffer)
    }

    /// Save an image, creating parent directories as needed
    ///
    /// # Errors
    /// - `Io` when the directory or file cannot be written
    /// - Encoder failures
    pub fn save_image(image: &Image, path: &Path, format: OutputFormat, quality: u8) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    EnhanceError::file_io_error("create output directory", parent, &e)
                })?;
            }
        }

        let bytes = Self::encode(image, format, quality)?;
        std::fs::write(path, bytes).map_err(|e| EnhanceError::file_io_error("write image", path, &e))
    }

    /// Encode an image and write it to an async writer
    ///
    /// # Errors
    /// - Encoder failures
    /// - `Io` when writing to the stream fails
    pub async fn save_to_writer<W: tokio::io::AsyncWrite + Unpin>(
        image: &Image,
        mut writer: W,
        format: OutputFormat,
        quality: u8,
    ) -> Result<u64> {
        use tokio::io::AsyncWriteExt;

        let bytes = Self::encode(image, format, quality)?;
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        Ok(bytes.len() as u64)
    }

    /// Check if a file path has a supported input extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_lowercase)
            .is_some_and(|ext| matches!(ext.as_str(), "jpg" | "jpeg" | "png"))
    }
}
