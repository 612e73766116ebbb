//! Extractors: turn one classified source into an [`ExtractedDocument`].
//!
//! | Kind  | Extractor          | Backend                              |
//! |-------|--------------------|--------------------------------------|
//! | url   | [`WebExtractor`]   | reqwest + scraper                    |
//! | pdf   | [`PdfExtractor`]   | pdfium text layer, lopdf fallback    |
//! | image | [`ImageExtractor`] | image decode + Tesseract             |
//! | text  | [`TextExtractor`]  | plain UTF-8 read                     |
//!
//! Every extractor normalizes its text through
//! [`crate::pipeline::normalize::normalize`] by way of
//! [`ExtractedDocument::new`], so callers never see raw whitespace.

pub mod image;
pub mod pdf;
pub mod text;
pub mod web;

use crate::config::BlogConfig;
use crate::error::Result;
use crate::output::{ExtractedDocument, SourceKind};

pub use self::image::ImageExtractor;
pub use self::pdf::PdfExtractor;
pub use self::text::TextExtractor;
pub use self::web::WebExtractor;

/// Common trait for all extractors.
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    /// Extract normalized text and metadata from `reference` (a URL or path).
    async fn extract(&self, reference: &str) -> Result<ExtractedDocument>;
}

/// Build the extractor for a classified source.
pub fn extractor_for(kind: SourceKind, config: &BlogConfig) -> Result<Box<dyn Extractor>> {
    Ok(match kind {
        SourceKind::Url => Box::new(WebExtractor::new(config)?),
        SourceKind::Pdf => Box::new(PdfExtractor::new()),
        SourceKind::Image => Box::new(ImageExtractor::new(config)),
        SourceKind::Text => Box::new(TextExtractor::new()),
    })
}
