//! Plain-text and transcript extraction.

use crate::error::{BlogError, Result};
use crate::output::{ExtractedDocument, MetaValue, SourceType};
use crate::pipeline::extract::Extractor;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Colon count above which a text is treated as a speaker-labelled transcript.
const TRANSCRIPT_COLON_THRESHOLD: usize = 20;

/// Reads UTF-8 text files, flagging meeting/podcast transcripts.
#[derive(Debug, Default)]
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Extractor for TextExtractor {
    async fn extract(&self, reference: &str) -> Result<ExtractedDocument> {
        let path = Path::new(reference);
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BlogError::extraction(format!("text file '{}'", path.display()), e))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| reference.to_string());
        extract_text(&raw, &filename)
    }
}

/// Build a document from raw file contents.
pub fn extract_text(raw: &str, filename: &str) -> Result<ExtractedDocument> {
    let transcript = is_transcript(raw);
    debug!("{}: transcript={}", filename, transcript);

    let mut metadata = BTreeMap::new();
    metadata.insert("filename".to_string(), MetaValue::from(filename));
    metadata.insert("is_transcript".to_string(), MetaValue::from(transcript));

    let source_type = if transcript {
        SourceType::Transcript
    } else {
        SourceType::Text
    };

    ExtractedDocument::new(raw, source_type, metadata, None)
        .map_err(|_| BlogError::extraction_msg(format!("text file '{filename}'"), "file is empty"))
        .map(|mut doc| {
            doc.title = title_from_first_line(raw);
            doc
        })
}

/// Brackets, a `Speaker` label, or lots of `name:` prefixes.
pub fn is_transcript(text: &str) -> bool {
    (text.contains('[') && text.contains(']'))
        || text.contains("Speaker")
        || text.matches(':').count() > TRANSCRIPT_COLON_THRESHOLD
}

/// First non-empty line of the raw text, verbatim apart from its line ending;
/// a leading `# ` heading marker is stripped and the rest trimmed.
fn title_from_first_line(content: &str) -> Option<String> {
    let first = content.split(['\n', '\r']).find(|l| !l.trim().is_empty())?;
    match first.strip_prefix("# ") {
        Some(rest) => Some(rest.trim().to_string()),
        None => Some(first.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_with_heading_title() {
        let doc = extract_text("# My Notes\n\nSome thoughts here.", "notes.md").unwrap();
        assert_eq!(doc.source_type, SourceType::Text);
        assert_eq!(doc.title.as_deref(), Some("My Notes"));
        assert_eq!(doc.meta("is_transcript").and_then(|m| m.as_flag()), Some(false));
        assert_eq!(doc.meta("filename").and_then(|m| m.as_text()), Some("notes.md"));
    }

    #[test]
    fn first_line_verbatim_without_marker() {
        let doc = extract_text("\n\nPlain opening line\nmore", "a.txt").unwrap();
        assert_eq!(doc.title.as_deref(), Some("Plain opening line"));
    }

    #[test]
    fn title_keeps_raw_spacing() {
        let doc = extract_text("Two   spaced  title\r\nbody", "a.txt").unwrap();
        assert_eq!(doc.title.as_deref(), Some("Two   spaced  title"));
        assert_eq!(doc.content, "Two spaced title\nbody");
    }

    #[test]
    fn transcript_by_brackets() {
        let doc = extract_text("[00:01] Hello\n[00:05] World", "talk.txt").unwrap();
        assert_eq!(doc.source_type, SourceType::Transcript);
        assert_eq!(doc.meta("is_transcript").and_then(|m| m.as_flag()), Some(true));
    }

    #[test]
    fn transcript_by_speaker_label() {
        assert!(is_transcript("Speaker 1 said hello"));
        assert!(!is_transcript("speaker lowercase only"));
    }

    #[test]
    fn transcript_by_colon_count() {
        let twenty = "a:".repeat(20);
        assert!(!is_transcript(&twenty));
        let twenty_one = "a:".repeat(21);
        assert!(is_transcript(&twenty_one));
    }

    #[test]
    fn empty_file_is_extraction_error() {
        let err = extract_text("  \n\n ", "blank.txt").unwrap_err();
        assert!(matches!(err, BlogError::Extraction { .. }));
    }

    #[tokio::test]
    async fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("essay.txt");
        std::fs::write(&p, "Title line\r\n\r\n\r\n\r\nBody   text").unwrap();
        let doc = TextExtractor::new().extract(p.to_str().unwrap()).await.unwrap();
        assert_eq!(doc.content, "Title line\n\nBody text");
        assert_eq!(doc.title.as_deref(), Some("Title line"));
    }
}
