//! Data types that flow between pipeline stages.
//!
//! ```text
//! ExtractedDocument ──▶ GeneratedPost ──▶ RenderedDocument
//!   (extractors)          (LLM reply)       (renderer)
//! ```

use crate::error::{BlogError, Result};
use crate::pipeline::normalize::normalize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which extractor produced a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Url,
    Pdf,
    ImageOcr,
    Transcript,
    Text,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Url => "url",
            SourceType::Pdf => "pdf",
            SourceType::ImageOcr => "image_ocr",
            SourceType::Transcript => "transcript",
            SourceType::Text => "text",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extraction strategy picked by the source classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Url,
    Pdf,
    Image,
    Text,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Url => "url",
            SourceKind::Pdf => "pdf",
            SourceKind::Image => "image",
            SourceKind::Text => "text",
        })
    }
}

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Flag(bool),
    Integer(i64),
    Text(String),
}

impl MetaValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            MetaValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            MetaValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// `false` for empty text; used to skip blank values in prompts.
    pub fn is_present(&self) -> bool {
        !matches!(self, MetaValue::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Flag(b) => write!(f, "{b}"),
            MetaValue::Integer(n) => write!(f, "{n}"),
            MetaValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Text(s)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        MetaValue::Flag(b)
    }
}

impl From<i64> for MetaValue {
    fn from(n: i64) -> Self {
        MetaValue::Integer(n)
    }
}

impl From<usize> for MetaValue {
    fn from(n: usize) -> Self {
        MetaValue::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

/// Uniform output of every extractor.
///
/// `content` is always normalized and never empty. `title` is `None` when no
/// title could be detected with confidence, which is distinct from an empty
/// string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub content: String,
    pub source_type: SourceType,
    pub metadata: BTreeMap<String, MetaValue>,
    pub title: Option<String>,
}

impl ExtractedDocument {
    /// Normalize `raw` and wrap it. Fails when nothing but whitespace remains.
    pub fn new(
        raw: &str,
        source_type: SourceType,
        metadata: BTreeMap<String, MetaValue>,
        title: Option<String>,
    ) -> Result<Self> {
        let content = normalize(raw);
        if content.is_empty() {
            return Err(BlogError::extraction_msg(
                format!("{source_type} source"),
                "no text content found",
            ));
        }
        Ok(Self {
            content,
            source_type,
            metadata,
            title,
        })
    }

    pub fn meta(&self, key: &str) -> Option<&MetaValue> {
        self.metadata.get(key)
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Structured reply from the generation service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPost {
    pub title: String,
    pub category: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    /// Markdown body; may contain callouts, pull quotes and a Trajectory section.
    pub content: String,
}

/// Final self-contained HTML page plus its slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub html: String,
    pub slug: String,
}
