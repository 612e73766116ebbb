//! Run-level entry points.
//!
//! A run is strictly sequential:
//!
//! ```text
//! classify ─▶ extract ─▶ generate ─▶ (refine…) ─▶ render ─▶ publish
//! ```
//!
//! Each function here is one step so the CLI can pause between them for the
//! interactive review loop. Nothing is written to disk until [`publish`].

use crate::config::BlogConfig;
use crate::error::{BlogError, Result};
use crate::output::{ExtractedDocument, GeneratedPost, RenderedDocument};
use crate::pipeline::extract::extractor_for;
use crate::pipeline::generate::{GenerationRequest, Generator};
use crate::pipeline::render::{today, RenderRequest, Renderer};
use crate::pipeline::classify;
use crate::sidecar;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Options for a render that are not part of the generated post.
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// `YYYY-MM-DD`; `None` means today.
    pub date: Option<String>,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
}

/// Files written by [`publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPaths {
    pub html: PathBuf,
    pub sidecar: PathBuf,
}

/// Classify `input` and run the matching extractor.
///
/// Does not require an LLM provider or API key.
pub async fn extract(input: impl AsRef<str>, config: &BlogConfig) -> Result<ExtractedDocument> {
    let start = Instant::now();
    let input = input.as_ref();
    let kind = classify::classify(input)?;
    info!("Extracting {} source: {}", kind, input);

    let extractor = extractor_for(kind, config)?;
    let doc = extractor.extract(input).await?;
    info!(
        "Extracted {} words as {} in {}ms",
        doc.word_count(),
        doc.source_type,
        start.elapsed().as_millis()
    );
    Ok(doc)
}

/// Send an extracted document to the generation service.
pub async fn generate_post(
    generator: &Generator,
    doc: &ExtractedDocument,
    instructions: Option<&str>,
    title: Option<&str>,
) -> Result<GeneratedPost> {
    let req = GenerationRequest::from_document(doc)
        .with_instructions(instructions)
        .with_title(title);
    let mut post = generator.generate(&req).await?;

    // An explicit title from the operator beats whatever the model chose.
    if let Some(t) = title.filter(|t| !t.trim().is_empty()) {
        post.title = t.trim().to_string();
    }
    if post.title.is_empty() {
        post.title = doc.title.clone().unwrap_or_else(|| "Untitled".to_string());
    }
    Ok(post)
}

/// Replace the post body with a refined version.
pub async fn refine_post(generator: &Generator, post: &mut GeneratedPost, feedback: &str) -> Result<()> {
    post.content = generator.refine(&post.content, feedback).await?;
    Ok(())
}

/// Render a post to a complete HTML page.
pub fn render_post(
    post: &GeneratedPost,
    opts: &PublishOptions,
    config: &BlogConfig,
) -> Result<RenderedDocument> {
    let mut req = RenderRequest::new(&post.title, &post.content)
        .with_excerpt(&post.excerpt)
        .with_category(&post.category);
    req.date = opts.date.clone();
    req.prev_link = opts.prev_link.clone();
    req.next_link = opts.next_link.clone();
    Renderer::new(config).render(&req)
}

/// Default output file stem: `essay-<slug>`.
pub fn default_stem(slug: &str) -> String {
    if slug.is_empty() {
        "essay-untitled".to_string()
    } else {
        format!("essay-{slug}")
    }
}

/// Render and write `<stem>.html` plus the `<stem>.md` sidecar.
///
/// `output` may be a directory (the default stem is used inside it), a path
/// with any extension (the extension is replaced), or `None` for the current
/// directory. Both files are written to temporaries first and only renamed
/// into place once both writes succeeded.
pub async fn publish(
    post: &GeneratedPost,
    opts: &PublishOptions,
    output: Option<&Path>,
    config: &BlogConfig,
) -> Result<PublishedPaths> {
    let date = opts.date.clone().unwrap_or_else(today);
    let opts = PublishOptions {
        date: Some(date.clone()),
        ..opts.clone()
    };
    let rendered = render_post(post, &opts, config)?;

    let stem_path = match output {
        Some(p) if p.is_dir() => p.join(default_stem(&rendered.slug)),
        Some(p) => p.with_extension(""),
        None => PathBuf::from(default_stem(&rendered.slug)),
    };
    let paths = PublishedPaths {
        html: stem_path.with_extension("html"),
        sidecar: stem_path.with_extension("md"),
    };

    let sidecar_text = sidecar::write_sidecar(post, &date)?;
    write_pair(
        (&paths.html, rendered.html.as_bytes()),
        (&paths.sidecar, sidecar_text.as_bytes()),
    )
    .await?;

    info!(
        "Wrote {} and {}",
        paths.html.display(),
        paths.sidecar.display()
    );
    Ok(paths)
}

/// Re-render a markdown file (with optional front matter) to HTML.
///
/// Missing front-matter fields default to title `Untitled`, the configured
/// default category, an empty excerpt and today's date. Returns the path of
/// the written HTML file.
pub async fn convert_markdown_file(
    input: impl AsRef<Path>,
    output: Option<&Path>,
    config: &BlogConfig,
) -> Result<PathBuf> {
    let input = input.as_ref();
    let text = tokio::fs::read_to_string(input).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BlogError::NotFound {
                reference: input.display().to_string(),
            }
        } else {
            BlogError::extraction(format!("markdown file '{}'", input.display()), e)
        }
    })?;

    let (fm, body) = sidecar::parse_sidecar(&text)?;
    let category = fm
        .category
        .as_deref()
        .and_then(|c| config.canonical_category(c))
        .unwrap_or(&config.default_category)
        .to_string();

    let mut req = RenderRequest::new(fm.title.unwrap_or_else(|| "Untitled".into()), body)
        .with_excerpt(fm.excerpt.unwrap_or_default())
        .with_category(category);
    req.date = fm.date;
    let rendered = Renderer::new(config).render(&req)?;

    let out = match output {
        Some(p) if p.is_dir() => p.join(format!("{}.html", default_stem(&rendered.slug))),
        Some(p) => p.to_path_buf(),
        None => input.with_extension("html"),
    };
    write_atomic(&out, rendered.html.as_bytes()).await?;
    info!("Wrote {}", out.display());
    Ok(out)
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BlogError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }
    Ok(())
}

async fn write_tmp(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    ensure_parent(path).await?;
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| BlogError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(tmp)
}

async fn commit(tmp: &Path, path: &Path) -> Result<()> {
    tokio::fs::rename(tmp, path)
        .await
        .map_err(|e| BlogError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Atomic write: write to temp, then rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = write_tmp(path, bytes).await?;
    commit(&tmp, path).await
}

/// Both temporaries are written before either rename.
async fn write_pair(a: (&Path, &[u8]), b: (&Path, &[u8])) -> Result<()> {
    let tmp_a = write_tmp(a.0, a.1).await?;
    let tmp_b = match write_tmp(b.0, b.1).await {
        Ok(t) => t,
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp_a).await;
            return Err(e);
        }
    };
    if let Err(e) = commit(&tmp_a, a.0).await {
        let _ = tokio::fs::remove_file(&tmp_a).await;
        let _ = tokio::fs::remove_file(&tmp_b).await;
        return Err(e);
    }
    if let Err(e) = commit(&tmp_b, b.0).await {
        // the first file is already in place; take it back out
        let _ = tokio::fs::remove_file(a.0).await;
        let _ = tokio::fs::remove_file(&tmp_b).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> GeneratedPost {
        GeneratedPost {
            title: "AI & the Future, Now!".into(),
            category: "Vision".into(),
            excerpt: "Where things go.".into(),
            tags: vec!["ai".into()],
            content: "Opening.\n\n## Trajectory\n\nOnwards.\n".into(),
        }
    }

    #[test]
    fn stems() {
        assert_eq!(default_stem("ai-now"), "essay-ai-now");
        assert_eq!(default_stem(""), "essay-untitled");
    }

    #[test]
    fn tmp_path_appends_suffix() {
        assert_eq!(tmp_path(Path::new("/a/b.html")), PathBuf::from("/a/b.html.tmp"));
    }

    #[tokio::test]
    async fn publish_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let opts = PublishOptions {
            date: Some("2024-03-15".into()),
            ..Default::default()
        };
        let paths = publish(&post(), &opts, Some(dir.path()), &BlogConfig::default())
            .await
            .unwrap();
        assert_eq!(paths.html, dir.path().join("essay-ai-the-future-now.html"));
        assert_eq!(paths.sidecar, dir.path().join("essay-ai-the-future-now.md"));

        let html = std::fs::read_to_string(&paths.html).unwrap();
        assert!(html.contains("<div class=\"trajectory\">"));
        assert!(html.contains("March 2024"));
        let md = std::fs::read_to_string(&paths.sidecar).unwrap();
        assert!(md.ends_with(&post().content));
        assert!(md.contains("date: 2024-03-15"));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn publish_bad_date_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let opts = PublishOptions {
            date: Some("March 15".into()),
            ..Default::default()
        };
        let err = publish(&post(), &opts, Some(dir.path()), &BlogConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BlogError::Format(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn publish_explicit_path_replaces_extension() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/my-post.html");
        let paths = publish(&post(), &PublishOptions::default(), Some(&target), &BlogConfig::default())
            .await
            .unwrap();
        assert_eq!(paths.html, target);
        assert_eq!(paths.sidecar, dir.path().join("nested/my-post.md"));
        assert!(paths.sidecar.exists());
    }

    #[tokio::test]
    async fn convert_defaults_without_front_matter() {
        let dir = tempfile::tempdir().unwrap();
        let md = dir.path().join("draft.md");
        std::fs::write(&md, "Some body text.").unwrap();
        let out = convert_markdown_file(&md, None, &BlogConfig::default()).await.unwrap();
        assert_eq!(out, dir.path().join("draft.html"));
        let html = std::fs::read_to_string(out).unwrap();
        assert!(html.contains("<h1>Untitled</h1>"));
        assert!(html.contains("<span class=\"article-tag\">Research</span>"));
    }

    #[tokio::test]
    async fn convert_crlf_sidecar_keeps_block_grammar() {
        let dir = tempfile::tempdir().unwrap();
        let md = dir.path().join("edited.md");
        std::fs::write(
            &md,
            "---\r\ntitle: Edited on Windows\r\ndate: 2024-03-15\r\n---\r\n\r\n> **Key Finding**\r\n> Still a callout.\r\n",
        )
        .unwrap();
        let out = convert_markdown_file(&md, None, &BlogConfig::default()).await.unwrap();
        let html = std::fs::read_to_string(out).unwrap();
        assert!(html.contains("<h1>Edited on Windows</h1>"));
        assert!(html.contains("<h4>Key Finding</h4>"), "got: {html}");
        assert!(!html.contains("<blockquote>"));
    }

    #[tokio::test]
    async fn failed_second_rename_removes_first_file() {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("post.html");
        let md = dir.path().join("post.md");
        // a directory in the way makes the second rename fail
        std::fs::create_dir(&md).unwrap();
        std::fs::write(md.join("keep"), "x").unwrap();

        let err = write_pair((html.as_path(), &b"<html>"[..]), (md.as_path(), &b"body"[..])).await.unwrap_err();
        assert!(matches!(err, BlogError::OutputWriteFailed { .. }));
        assert!(!html.exists());
        assert!(!dir.path().join("post.html.tmp").exists());
        assert!(!dir.path().join("post.md.tmp").exists());
    }

    #[tokio::test]
    async fn convert_missing_file_is_not_found() {
        let err = convert_markdown_file("/no/such/file.md", None, &BlogConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BlogError::NotFound { .. }));
    }

    #[tokio::test]
    async fn extract_missing_reference() {
        let err = extract("/no/such/input.txt", &BlogConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BlogError::NotFound { .. }));
    }
}
