//! Structured-text sidecar: YAML front matter plus the raw markdown body.
//!
//! ```text
//! ---
//! title: Rendering at Scale
//! category: Analysis
//! excerpt: Short summary.
//! tags:
//! - gpu
//! - rendering
//! date: 2024-03-15
//! ---
//!
//! <markdown body, byte for byte as rendered>
//! ```
//!
//! The sidecar is what `blogpost convert` reads back, so a post can be edited
//! by hand and re-rendered without another LLM call. Hand-written sidecars
//! may also give `tags` as a comma list (`tags: gpu, rendering`).

use crate::error::{BlogError, Result};
use crate::output::GeneratedPost;
use serde::{Deserialize, Deserializer, Serialize};

const FENCE: &str = "---";

/// Parsed front matter. Missing keys are `None`; unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(deserialize_with = "tag_list")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagList {
    Many(Vec<String>),
    Csv(String),
}

/// `tags` is a YAML sequence or a comma-separated string.
fn tag_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<TagList>::deserialize(deserializer)? {
        Some(TagList::Many(tags)) => tags,
        Some(TagList::Csv(s)) => s
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        None => Vec::new(),
    })
}

/// Serialize a post and its date into sidecar text.
///
/// # Errors
/// [`BlogError::Format`] if the header cannot be encoded as YAML.
pub fn write_sidecar(post: &GeneratedPost, date: &str) -> Result<String> {
    let fm = FrontMatter {
        title: Some(post.title.clone()),
        category: Some(post.category.clone()),
        excerpt: Some(post.excerpt.clone()),
        tags: post.tags.clone(),
        date: Some(date.to_string()),
    };
    let header = serde_yaml::to_string(&fm)
        .map_err(|e| BlogError::Format(format!("cannot encode front matter: {}", e)))?;
    Ok(format!("{FENCE}\n{header}{FENCE}\n\n{}", post.content))
}

/// Split sidecar text into front matter and body.
///
/// Text that does not start with a `---` line has no front matter and is all
/// body. The body is returned byte for byte, minus the single blank line the
/// writer puts after the closing fence.
///
/// # Errors
/// [`BlogError::Format`] if the front matter is never closed or is not a
/// YAML mapping of the known keys.
pub fn parse_sidecar(text: &str) -> Result<(FrontMatter, String)> {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let mut lines = text.split_inclusive('\n');

    let header_start = match lines.next() {
        Some(first) if first.trim_end() == FENCE => first.len(),
        _ => return Ok((FrontMatter::default(), text.to_string())),
    };

    let mut consumed = header_start;
    let mut header_end = None;
    for raw in lines {
        if raw.trim_end() == FENCE {
            header_end = Some(consumed);
            consumed += raw.len();
            break;
        }
        consumed += raw.len();
    }
    let header_end = header_end.ok_or_else(|| {
        BlogError::Format("front matter is missing its closing '---' line".into())
    })?;

    let header = &text[header_start..header_end];
    let fm = if header.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str(header)
            .map_err(|e| BlogError::Format(format!("invalid front matter: {}", e)))?
    };

    let body = &text[consumed..];
    let body = body
        .strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body);
    Ok((fm, body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> GeneratedPost {
        GeneratedPost {
            title: "Rendering at Scale".into(),
            category: "Analysis".into(),
            excerpt: "Line one.\nLine two.".into(),
            tags: vec!["gpu".into(), "vfx".into()],
            content: "## Intro\n\n> **Key Finding**\n> Body.\n".into(),
        }
    }

    #[test]
    fn write_layout() {
        let s = write_sidecar(&post(), "2024-03-15").unwrap();
        assert!(s.starts_with("---\ntitle: Rendering at Scale\ncategory: Analysis\n"));
        assert!(s.contains("tags:\n- gpu\n- vfx\n"), "got: {s}");
        assert!(s.ends_with("---\n\n## Intro\n\n> **Key Finding**\n> Body.\n"));
    }

    #[test]
    fn round_trip_keeps_body_bytes() {
        let p = post();
        let (fm, body) = parse_sidecar(&write_sidecar(&p, "2024-03-15").unwrap()).unwrap();
        assert_eq!(body, p.content);
        assert_eq!(fm.title.as_deref(), Some("Rendering at Scale"));
        assert_eq!(fm.category.as_deref(), Some("Analysis"));
        assert_eq!(fm.excerpt.as_deref(), Some("Line one.\nLine two."));
        assert_eq!(fm.tags, vec!["gpu", "vfx"]);
        assert_eq!(fm.date.as_deref(), Some("2024-03-15"));
    }

    #[test]
    fn quotes_and_commas_survive_round_trip() {
        let mut p = post();
        p.title = "\"Worse Is Better\"".into();
        p.excerpt = "key: value # not a comment".into();
        p.tags = vec!["a, b".into(), "'c'".into()];
        let (fm, _) = parse_sidecar(&write_sidecar(&p, "2024-03-15").unwrap()).unwrap();
        assert_eq!(fm.title.as_deref(), Some("\"Worse Is Better\""));
        assert_eq!(fm.excerpt.as_deref(), Some("key: value # not a comment"));
        assert_eq!(fm.tags, vec!["a, b", "'c'"]);
    }

    #[test]
    fn no_front_matter_is_all_body() {
        let (fm, body) = parse_sidecar("# Plain\n\ntext").unwrap();
        assert_eq!(fm, FrontMatter::default());
        assert_eq!(body, "# Plain\n\ntext");
    }

    #[test]
    fn unclosed_front_matter_is_format_error() {
        let err = parse_sidecar("---\ntitle: x\nbody").unwrap_err();
        assert!(matches!(err, BlogError::Format(_)));
    }

    #[test]
    fn non_mapping_header_is_format_error() {
        let err = parse_sidecar("---\njust words\n---\nbody").unwrap_err();
        assert!(matches!(err, BlogError::Format(_)));
        assert!(err.to_string().contains("front matter"), "got: {err}");
    }

    #[test]
    fn quoted_values_and_tag_forms() {
        let src = "---\ntitle: \"Quoted: Title\"\ntags: ['a', \"b\", c]\nunknown: ignored\n---\nBody";
        let (fm, body) = parse_sidecar(src).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Quoted: Title"));
        assert_eq!(fm.tags, vec!["a", "b", "c"]);
        assert_eq!(body, "Body");

        let (fm, _) = parse_sidecar("---\ntags: gpu, vfx\n---\n").unwrap();
        assert_eq!(fm.tags, vec!["gpu", "vfx"]);
    }

    #[test]
    fn crlf_front_matter() {
        let src = "---\r\ntitle: Windows\r\ndate: 2024-03-15\r\n---\r\n\r\n> **Note**\r\n> Hi.\r\n";
        let (fm, body) = parse_sidecar(src).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Windows"));
        assert_eq!(fm.date.as_deref(), Some("2024-03-15"));
        assert_eq!(body, "> **Note**\r\n> Hi.\r\n");
    }
}
