//! Image extraction via OCR.
//!
//! The size limit is checked against file metadata before any decoding, so an
//! oversized upload costs one `stat`. Decoded images are normalised to 8-bit
//! RGB and handed to Tesseract as a temporary PNG; palette, alpha and 16-bit
//! inputs OCR noticeably worse otherwise.

use crate::config::BlogConfig;
use crate::error::{BlogError, Result};
use crate::output::{ExtractedDocument, MetaValue, SourceType};
use crate::pipeline::extract::Extractor;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

/// Runs OCR over screenshots and scans.
#[derive(Debug, Clone)]
pub struct ImageExtractor {
    max_bytes: u64,
    language: String,
    tesseract_cmd: String,
}

/// What we learned while decoding.
struct PreparedImage {
    png: NamedTempFile,
    width: u32,
    height: u32,
    format: String,
}

impl ImageExtractor {
    pub fn new(config: &BlogConfig) -> Self {
        Self {
            max_bytes: config.max_image_bytes,
            language: config.ocr_language.clone(),
            tesseract_cmd: config.tesseract_cmd.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Extractor for ImageExtractor {
    async fn extract(&self, reference: &str) -> Result<ExtractedDocument> {
        let path = PathBuf::from(reference);
        let what = format!("image '{}'", path.display());

        let size = tokio::fs::metadata(&path)
            .await
            .map_err(|e| BlogError::extraction(&what, e))?
            .len();
        check_size(size, self.max_bytes, &path)?;

        let prepared = tokio::task::spawn_blocking(move || prepare_image(&path))
            .await
            .map_err(|e| BlogError::Internal(format!("Image task panicked: {}", e)))??;
        debug!(
            "Decoded {} {}x{}",
            prepared.format, prepared.width, prepared.height
        );

        info!("Running OCR ({}) on {}", self.language, what);
        let text = run_tesseract(&self.tesseract_cmd, prepared.png.path(), &self.language).await?;

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "image_size".to_string(),
            MetaValue::from(format!("{}x{}", prepared.width, prepared.height)),
        );
        metadata.insert("format".to_string(), MetaValue::from(prepared.format));
        metadata.insert(
            "is_reddit_screenshot".to_string(),
            MetaValue::from(looks_like_reddit(&text)),
        );

        ExtractedDocument::new(&text, SourceType::ImageOcr, metadata, None)
            .map_err(|_| BlogError::extraction_msg(what, "OCR found no text in the image"))
    }
}

fn check_size(size: u64, max: u64, path: &Path) -> Result<()> {
    if size > max {
        return Err(BlogError::Validation(format!(
            "image '{}' is {} bytes; the limit is {} bytes",
            path.display(),
            size,
            max
        )));
    }
    Ok(())
}

/// Heuristic: screenshot of a Reddit thread.
pub fn looks_like_reddit(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("reddit") || lower.contains("r/")
}

/// Blocking: decode, normalise to RGB8, write a temp PNG.
fn prepare_image(path: &Path) -> Result<PreparedImage> {
    let what = format!("image '{}'", path.display());

    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| BlogError::extraction(&what, e))?;
    let format = reader
        .format()
        .map(|f| format!("{:?}", f).to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string());
    let decoded = reader.decode().map_err(|e| BlogError::extraction(&what, e))?;

    let rgb = match decoded {
        DynamicImage::ImageRgb8(_) => decoded,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    };

    let png = tempfile::Builder::new()
        .prefix("blogpost-ocr-")
        .suffix(".png")
        .tempfile()
        .map_err(|e| BlogError::Internal(format!("tempfile: {e}")))?;
    rgb.save_with_format(png.path(), ImageFormat::Png)
        .map_err(|e| BlogError::extraction(&what, e))?;

    Ok(PreparedImage {
        png,
        width: rgb.width(),
        height: rgb.height(),
        format,
    })
}

/// `tesseract <png> stdout -l <lang>`.
async fn run_tesseract(cmd: &str, png: &Path, language: &str) -> Result<String> {
    let output = Command::new(cmd)
        .arg(png)
        .arg("stdout")
        .arg("-l")
        .arg(language)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BlogError::extraction_msg(
                    "image",
                    format!(
                        "OCR engine '{cmd}' not found.\n\
                         Install Tesseract (e.g. `apt install tesseract-ocr` or \
                         `brew install tesseract`) or pass --tesseract <PATH>."
                    ),
                )
            } else {
                BlogError::extraction("image", e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BlogError::extraction_msg(
            "image",
            format!("tesseract exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
