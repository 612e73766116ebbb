//! PDF text extraction.
//!
//! ## Two backends
//!
//! The primary path reads the text layer through pdfium, which understands
//! reading order and ligatures. pdfium is a shared library bound at runtime
//! (`PDFIUM_LIB_PATH`, else the system library), so it may be missing. The
//! fallback path uses `lopdf`'s content-stream text extraction, which needs
//! nothing outside the crate. The fallback runs whenever the primary path
//! fails or yields only whitespace (scanned documents, odd encodings).
//!
//! Both backends are blocking and run inside `spawn_blocking`.

use crate::error::{BlogError, Result};
use crate::output::{ExtractedDocument, MetaValue, SourceType};
use crate::pipeline::extract::Extractor;
use crate::pipeline::normalize::normalize;
use pdfium_render::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// How many leading lines are scanned for a title when metadata has none.
const TITLE_SCAN_LINES: usize = 10;

/// Extracts text and document info from PDF files.
#[derive(Debug, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Extractor for PdfExtractor {
    async fn extract(&self, reference: &str) -> Result<ExtractedDocument> {
        let path = PathBuf::from(reference);
        tokio::task::spawn_blocking(move || extract_pdf_blocking(&path))
            .await
            .map_err(|e| BlogError::Internal(format!("PDF task panicked: {}", e)))?
    }
}

/// Raw output of one backend.
#[derive(Debug, Default)]
struct PdfText {
    pages: Vec<String>,
    page_count: usize,
    title: Option<String>,
    author: Option<String>,
    subject: Option<String>,
}

impl PdfText {
    fn has_text(&self) -> bool {
        self.pages.iter().any(|p| !p.trim().is_empty())
    }

    /// Fill fields this backend could not provide from another one.
    fn fill_missing(&mut self, other: &PdfText) {
        if self.title.is_none() {
            self.title.clone_from(&other.title);
        }
        if self.author.is_none() {
            self.author.clone_from(&other.author);
        }
        if self.subject.is_none() {
            self.subject.clone_from(&other.subject);
        }
        if self.page_count == 0 {
            self.page_count = other.page_count;
        }
    }
}

/// Blocking implementation of PDF extraction.
fn extract_pdf_blocking(path: &Path) -> Result<ExtractedDocument> {
    let what = format!("PDF '{}'", path.display());

    let primary = match read_with_pdfium(path) {
        Ok(p) => Some(p),
        Err(e) => {
            warn!("pdfium unavailable for {}: {:?}", path.display(), e);
            None
        }
    };

    let extracted = match primary {
        Some(p) if p.has_text() => {
            debug!("pdfium extracted {} pages", p.pages.len());
            p
        }
        primary => {
            info!("Falling back to lopdf text extraction for {}", path.display());
            let fallback = read_with_lopdf(path).map_err(|e| BlogError::extraction(&what, e))?;
            match primary {
                // pdfium opened the file; its metadata wins.
                Some(mut p) => {
                    p.fill_missing(&fallback);
                    p.pages = fallback.pages;
                    p
                }
                None => fallback,
            }
        }
    };

    let raw = extracted.pages.join("\n\n");
    let content = normalize(&raw);
    if content.is_empty() {
        return Err(BlogError::extraction_msg(
            what,
            "no text layer found (scanned PDFs need OCR: export pages as images first)",
        ));
    }

    let title = extracted
        .title
        .clone()
        .or_else(|| title_from_content(&content));

    let mut metadata = BTreeMap::new();
    if let Some(ref t) = extracted.title {
        metadata.insert("title".to_string(), MetaValue::from(t.as_str()));
    }
    if let Some(ref a) = extracted.author {
        metadata.insert("author".to_string(), MetaValue::from(a.as_str()));
    }
    if let Some(ref s) = extracted.subject {
        metadata.insert("subject".to_string(), MetaValue::from(s.as_str()));
    }
    metadata.insert("pages".to_string(), MetaValue::from(extracted.page_count));

    ExtractedDocument::new(&content, SourceType::Pdf, metadata, title)
}

/// First of the leading lines whose trimmed length is strictly between 10
/// and 200 characters.
pub fn title_from_content(content: &str) -> Option<String> {
    content
        .lines()
        .take(TITLE_SCAN_LINES)
        .map(str::trim)
        .find(|l| {
            let n = l.chars().count();
            n > 10 && n < 200
        })
        .map(str::to_string)
}

fn non_empty(s: String) -> Option<String> {
    let s = s.trim().to_string();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

// ── pdfium backend ───────────────────────────────────────────────────────────

fn bind_pdfium() -> std::result::Result<Pdfium, PdfiumError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.is_empty() => Pdfium::bind_to_library(&p).or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&p))
        })?,
        _ => Pdfium::bind_to_system_library()?,
    };
    Ok(Pdfium::new(bindings))
}

/// Whether libpdfium can be bound in this environment. Without it PDFs are
/// still read, through the pure-Rust fallback.
pub fn pdfium_available() -> bool {
    bind_pdfium().is_ok()
}

fn read_with_pdfium(path: &Path) -> std::result::Result<PdfText, PdfiumError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium.load_pdf_from_file(path, None)?;

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| non_empty(t.value().to_string()))
    };

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        match page.text() {
            Ok(text) => pages.push(text.all()),
            Err(e) => {
                warn!("pdfium: no text for page {}: {:?}", idx + 1, e);
                pages.push(String::new());
            }
        }
    }

    Ok(PdfText {
        page_count: pages.len(),
        pages,
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
    })
}

// ── lopdf backend ────────────────────────────────────────────────────────────

fn read_with_lopdf(path: &Path) -> std::result::Result<PdfText, lopdf::Error> {
    let doc = lopdf::Document::load(path)?;
    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

    let pages = page_numbers
        .iter()
        .map(|n| match doc.extract_text(&[*n]) {
            Ok(t) => t,
            Err(e) => {
                warn!("lopdf: no text for page {}: {}", n, e);
                String::new()
            }
        })
        .collect();

    let info = info_dictionary(&doc);
    let get_info = |key: &[u8]| -> Option<String> {
        info.and_then(|d| d.get(key).ok())
            .and_then(|o| o.as_str().ok())
            .and_then(|bytes| non_empty(decode_pdf_string(bytes)))
    };

    Ok(PdfText {
        page_count: page_numbers.len(),
        pages,
        title: get_info(b"Title"),
        author: get_info(b"Author"),
        subject: get_info(b"Subject"),
    })
}

/// The trailer `/Info` dictionary, direct or by reference.
fn info_dictionary(doc: &lopdf::Document) -> Option<&lopdf::Dictionary> {
    let info = doc.trailer.get(b"Info").ok()?;
    match info {
        lopdf::Object::Reference(id) => doc.get_dictionary(*id).ok(),
        other => other.as_dict().ok(),
    }
}

/// Decode a PDF text string: UTF-16BE with a BOM, else Latin-1-ish bytes.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_from_first_plausible_line() {
        let content = "3\nShort\nA Survey of Rendering Pipelines\nbody text";
        assert_eq!(
            title_from_content(content).as_deref(),
            Some("A Survey of Rendering Pipelines")
        );
    }

    #[test]
    fn title_bounds_are_exclusive() {
        // exactly 10 chars is too short
        assert_eq!(title_from_content("abcdefghij"), None);
        assert_eq!(title_from_content("abcdefghijk").as_deref(), Some("abcdefghijk"));
        let long = "x".repeat(200);
        assert_eq!(title_from_content(&long), None);
    }

    #[test]
    fn title_scan_stops_after_ten_lines() {
        let mut content = "a\n".repeat(10);
        content.push_str("A perfectly good title line");
        assert_eq!(title_from_content(&content), None);
    }

    #[test]
    fn decode_utf16_bom() {
        let bytes = [0xFE, 0xFF, 0x00, b'H', 0x00, b'i'];
        assert_eq!(decode_pdf_string(&bytes), "Hi");
        assert_eq!(decode_pdf_string(b"Plain"), "Plain");
    }

    #[test]
    fn fill_missing_keeps_existing() {
        let mut a = PdfText {
            title: Some("A".into()),
            ..Default::default()
        };
        let b = PdfText {
            title: Some("B".into()),
            author: Some("Ann".into()),
            page_count: 4,
            ..Default::default()
        };
        a.fill_missing(&b);
        assert_eq!(a.title.as_deref(), Some("A"));
        assert_eq!(a.author.as_deref(), Some("Ann"));
        assert_eq!(a.page_count, 4);
    }

    #[tokio::test]
    async fn garbage_file_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("broken.pdf");
        std::fs::write(&p, b"this is not a pdf").unwrap();
        let err = PdfExtractor::new()
            .extract(p.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, BlogError::Extraction { .. }), "got: {err}");
    }
}
