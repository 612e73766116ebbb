//! Document rendering: wrap a post body in the site's page template.
//!
//! Everything here is deterministic given its inputs (the date defaults to
//! today, which is the only ambient read). The produced page is
//! self-contained: CSS is embedded and no external asset is referenced.

use crate::config::BlogConfig;
use crate::error::{BlogError, Result};
use crate::output::RenderedDocument;
use crate::pipeline::blocks;
use crate::pipeline::markdown::escape_html;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Input to [`Renderer::render`].
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    pub title: String,
    pub markdown: String,
    pub excerpt: String,
    pub category: String,
    /// `YYYY-MM-DD`; `None` means today.
    pub date: Option<String>,
    /// Explicit slug; `None` derives one from the title.
    pub slug: Option<String>,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
}

impl RenderRequest {
    pub fn new(title: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            markdown: markdown.into(),
            ..Default::default()
        }
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = excerpt.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_prev_link(mut self, link: impl Into<String>) -> Self {
        self.prev_link = Some(link.into());
        self
    }

    pub fn with_next_link(mut self, link: impl Into<String>) -> Self {
        self.next_link = Some(link.into());
        self
    }
}

/// Renders posts for one site (author + reading speed).
#[derive(Debug, Clone)]
pub struct Renderer {
    author: String,
    words_per_minute: u32,
}

impl Renderer {
    pub fn new(config: &BlogConfig) -> Self {
        Self {
            author: config.author.clone(),
            words_per_minute: config.words_per_minute.max(1),
        }
    }

    /// Render a complete HTML page.
    ///
    /// # Errors
    /// [`BlogError::Format`] if `date` is present but not `YYYY-MM-DD`.
    pub fn render(&self, req: &RenderRequest) -> Result<RenderedDocument> {
        let date = match req.date.as_deref() {
            Some(d) if !d.trim().is_empty() => d.trim().to_string(),
            _ => today(),
        };
        let formatted_date = format_date(&date)?;

        let slug = req
            .slug
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| slugify(&req.title));

        let minutes = reading_time(&req.markdown, self.words_per_minute);
        let body = blocks::render_body(&req.markdown);
        let nav = navigation(req.prev_link.as_deref(), req.next_link.as_deref());
        debug!("Rendered '{}': {} min read, slug={}", req.title, minutes, slug);

        let title = escape_html(&req.title);
        let excerpt = escape_html(&req.excerpt);
        let category = escape_html(&req.category);
        let author = escape_html(&self.author);

        let html = format!(
            r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{title} | {author}</title>
  <meta name="description" content="{excerpt}">
  <meta name="author" content="{author}">
  <meta property="og:title" content="{title}" />
  <meta property="og:description" content="{excerpt}" />
  <meta property="og:type" content="article" />
  <style>
{style}
  </style>
</head>
<body>
  <nav class="site-nav">
    <a href="index.html">← Back to Work</a> |
    <a href="writing.html">All Writing</a>
  </nav>

  <article class="article-wrap">
    <header class="article-header">
      <div class="article-meta">
        <span class="article-tag">{category}</span>
        <span>{minutes} min read</span>
        <span>{formatted_date}</span>
      </div>
      <h1>{title}</h1>
      <p class="article-lede">{excerpt}</p>
    </header>

    <div class="article-content">
{body}
    </div>

    <div class="article-footer">
{nav}
    </div>
  </article>
</body>
</html>
"#,
            style = PAGE_STYLE,
        );

        Ok(RenderedDocument { html, slug })
    }
}

// ── Slug ─────────────────────────────────────────────────────────────────────

static RE_SLUG_STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static RE_SLUG_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s_]+").unwrap());

/// URL-friendly slug: lowercase, punctuation dropped, separators → `-`.
///
/// ```rust
/// use edgequake_blogpost::pipeline::render::slugify;
/// assert_eq!(slugify("AI & the Future, Now!"), "ai-the-future-now");
/// ```
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = RE_SLUG_STRIP.replace_all(&lower, "");
    let joined = RE_SLUG_SEP.replace_all(&stripped, "-");
    joined.trim_matches('-').to_string()
}

// ── Reading time ─────────────────────────────────────────────────────────────

/// Whole minutes at `words_per_minute`, rounded half-to-even, never below 1.
pub fn reading_time(markdown: &str, words_per_minute: u32) -> u32 {
    let words = markdown.split_whitespace().count() as f64;
    let minutes = (words / f64::from(words_per_minute.max(1))).round_ties_even();
    (minutes as u32).max(1)
}

// ── Date ─────────────────────────────────────────────────────────────────────

/// `2024-03-15` → `March 2024`.
pub fn format_date(date: &str) -> Result<String> {
    let parsed = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| BlogError::Format(format!("date '{date}' is not YYYY-MM-DD ({e})")))?;
    Ok(parsed.format("%B %Y").to_string())
}

/// Today's local date as `YYYY-MM-DD`.
pub fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

// ── Navigation ───────────────────────────────────────────────────────────────

/// Footer links; empty when neither side is present.
pub fn navigation(prev_link: Option<&str>, next_link: Option<&str>) -> String {
    let prev_link = prev_link.filter(|l| !l.trim().is_empty());
    let next_link = next_link.filter(|l| !l.trim().is_empty());
    if prev_link.is_none() && next_link.is_none() {
        return String::new();
    }

    let prev = match prev_link {
        Some(l) => format!("<a href=\"{}\">← Previous</a>", escape_html(l)),
        None => "<span></span>".to_string(),
    };
    let next = match next_link {
        Some(l) => format!("<a href=\"{}\">Next →</a>", escape_html(l)),
        None => "<span></span>".to_string(),
    };

    format!("      <div class=\"footer-nav\">\n        {prev}\n        {next}\n      </div>")
}

// ── Template ─────────────────────────────────────────────────────────────────

const PAGE_STYLE: &str = r#"    :root {
      --bg:#ffffff;
      --card:#fafafa;
      --text:#1f2937;
      --muted:#6b7280;
      --accent:#1e3a8a;
      --cyan:#06b6d4;
      --border:#e5e7eb;
    }
    html,body{margin:0;padding:0;background:var(--bg);color:var(--text);font:17px/1.8 -apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif}
    .article-wrap{max-width:740px;margin:0 auto;padding:60px 20px}
    .article-header{border-bottom:1px solid var(--border);padding-bottom:32px;margin-bottom:40px}
    .article-meta{display:flex;gap:16px;align-items:center;margin-bottom:20px;font-size:14px;color:var(--muted)}
    .article-tag{background:rgba(76,201,240,0.15);color:var(--accent);padding:6px 14px;border-radius:6px;font-size:12px;font-weight:600;text-transform:uppercase;letter-spacing:0.5px}
    h1{margin:0 0 20px;font-size:clamp(32px,5vw,44px);line-height:1.2;letter-spacing:-0.5px}
    .article-lede{font-size:20px;color:var(--muted);line-height:1.6;margin:0}
    .article-content h2{font-size:28px;margin:48px 0 20px;letter-spacing:-0.3px}
    .article-content h3{font-size:22px;margin:36px 0 16px;color:var(--accent)}
    .article-content p{margin:20px 0;color:var(--muted)}
    .article-content strong{color:var(--text);font-weight:600}
    .article-content a{color:var(--cyan);text-decoration:none;border-bottom:1px solid rgba(6,182,212,0.3)}
    .article-content ul,.article-content ol{margin:20px 0;padding-left:24px;color:var(--muted)}
    .article-content li{margin:8px 0}
    .article-content table{border-collapse:collapse;margin:24px 0;width:100%}
    .article-content th,.article-content td{border:1px solid var(--border);padding:8px 12px;text-align:left}
    .article-content code{background:var(--card);padding:2px 6px;border-radius:3px;font-size:0.9em;font-family:Monaco,Consolas,monospace;color:var(--accent)}
    .article-content pre{background:var(--card);padding:20px;border-radius:8px;overflow-x:auto;margin:24px 0}
    .article-content pre code{background:none;padding:0}
    .callout{background:var(--card);border-left:4px solid var(--accent);border-radius:8px;padding:24px 28px;margin:32px 0}
    .callout h4{margin:0 0 12px;color:var(--accent);font-size:14px;text-transform:uppercase;letter-spacing:0.5px}
    .callout p{margin:0;color:var(--muted)}
    .pull-quote{font-size:24px;line-height:1.5;color:var(--accent);font-style:italic;margin:40px 0;padding:24px 0;border-top:1px solid var(--border);border-bottom:1px solid var(--border);text-align:center}
    .trajectory{background:linear-gradient(135deg,#1a1d2a 0%,#0f1115 100%);border:1px solid var(--border);border-radius:16px;padding:32px;margin:48px 0}
    .trajectory h3{margin:0 0 16px;color:var(--cyan);font-size:22px}
    .trajectory p,.trajectory ul,.trajectory li{color:#d1d5db}
    .article-footer{margin-top:60px;padding-top:32px;border-top:1px solid var(--border)}
    .footer-nav{display:flex;justify-content:space-between;gap:20px;flex-wrap:wrap}
    .footer-nav a{color:var(--accent);text-decoration:none;font-size:15px}
    .site-nav{margin:20px auto;padding:16px 20px;border-bottom:1px solid var(--border);max-width:740px}
    .site-nav a{margin-right:24px;color:var(--muted);font-size:14px;text-transform:uppercase;letter-spacing:0.5px;text-decoration:none}"#;
