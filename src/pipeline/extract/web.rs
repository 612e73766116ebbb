//! Web page extraction.
//!
//! The page is fetched once with a browser-like `User-Agent`, then walked
//! element by element. Navigation chrome (`nav`, `header`, `footer`) and
//! non-content elements (`script`, `style`) are skipped along with their whole
//! subtree. Block elements become line breaks; inline runs stay on one line.

use crate::config::BlogConfig;
use crate::error::{BlogError, Result};
use crate::output::{ExtractedDocument, MetaValue, SourceType};
use crate::pipeline::extract::Extractor;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

const SKIP_TAGS: [&str; 5] = ["script", "style", "nav", "footer", "header"];

/// Elements followed by a paragraph break.
const PARAGRAPH_TAGS: [&str; 16] = [
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "ul", "ol", "table", "section",
    "article", "figure", "pre", "hr",
];

/// Elements followed by a single line break.
const LINE_TAGS: [&str; 8] = ["div", "li", "tr", "br", "dd", "dt", "figcaption", "main"];

static SEL_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static SEL_H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static SEL_CONTAINERS: Lazy<[Selector; 3]> = Lazy::new(|| {
    [
        Selector::parse("article").unwrap(),
        Selector::parse("main").unwrap(),
        Selector::parse("body").unwrap(),
    ]
});

/// Fetches a URL and extracts its readable text.
pub struct WebExtractor {
    client: Client,
    timeout_secs: u64,
}

impl WebExtractor {
    pub fn new(config: &BlogConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| BlogError::Internal(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs: config.fetch_timeout_secs,
        })
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        info!("Fetching: {}", url);

        let fetch_err = |reason: String| BlogError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                fetch_err(format!("timed out after {}s", self.timeout_secs))
            } else {
                fetch_err(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}")));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                fetch_err(format!("timed out after {}s", self.timeout_secs))
            } else {
                fetch_err(e.to_string())
            }
        })?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

#[async_trait::async_trait]
impl Extractor for WebExtractor {
    async fn extract(&self, reference: &str) -> Result<ExtractedDocument> {
        let body = self.fetch(reference).await?;
        extract_html(&body, reference)
    }
}

/// Extract text, title and metadata from an already-fetched HTML page.
pub fn extract_html(html: &str, url: &str) -> Result<ExtractedDocument> {
    let document = Html::parse_document(html);

    let title = page_title(&document);

    let container = SEL_CONTAINERS
        .iter()
        .find_map(|sel| document.select(sel).find(|el| !inside_skipped(el)));

    let mut sink = TextSink::default();
    match container {
        Some(el) => walk(el, &mut sink),
        None => walk(document.root_element(), &mut sink),
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("url".to_string(), MetaValue::from(url));
    let domain = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();
    metadata.insert("domain".to_string(), MetaValue::from(domain));

    ExtractedDocument::new(&sink.finish(), SourceType::Url, metadata, title).map_err(|_| {
        BlogError::extraction_msg(format!("URL '{url}'"), "page has no readable text")
    })
}

/// `<title>` if non-empty, else the first `<h1>` outside skipped chrome.
fn page_title(document: &Html) -> Option<String> {
    let from_title = document
        .select(&SEL_TITLE)
        .next()
        .map(|el| collapse_ws(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    from_title.or_else(|| {
        document
            .select(&SEL_H1)
            .filter(|h| !inside_skipped(h))
            .map(|h| collapse_ws(&h.text().collect::<String>()))
            .find(|t| !t.is_empty())
    })
}

fn inside_skipped(el: &ElementRef) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| SKIP_TAGS.contains(&a.value().name()))
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Recursive walk that skips chrome and emits block separation.
fn walk(element: ElementRef, sink: &mut TextSink) {
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            let tag = child_el.value().name();
            if SKIP_TAGS.contains(&tag) {
                continue;
            }
            if tag == "pre" {
                sink.paragraph();
                sink.push_verbatim(&child_el.text().collect::<String>());
                sink.paragraph();
                continue;
            }
            let is_para = PARAGRAPH_TAGS.contains(&tag);
            let is_line = LINE_TAGS.contains(&tag);
            if is_para {
                sink.paragraph();
            } else if is_line {
                sink.line();
            }
            walk(child_el, sink);
            if is_para {
                sink.paragraph();
            } else if is_line {
                sink.line();
            }
        } else if let Some(text) = child.value().as_text() {
            sink.push_text(text);
        }
    }
}

/// Accumulates text while collapsing inline whitespace.
#[derive(Default)]
struct TextSink {
    out: String,
}

impl TextSink {
    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                if !self.out.is_empty() && !self.out.ends_with([' ', '\n']) {
                    self.out.push(' ');
                }
            } else {
                self.out.push(c);
            }
        }
    }

    fn push_verbatim(&mut self, text: &str) {
        self.out.push_str(text.trim_matches('\n'));
    }

    fn trim_trailing_spaces(&mut self) {
        let len = self.out.trim_end_matches(' ').len();
        self.out.truncate(len);
    }

    fn line(&mut self) {
        self.trim_trailing_spaces();
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn paragraph(&mut self) {
        self.trim_trailing_spaces();
        if self.out.is_empty() || self.out.ends_with("\n\n") {
            return;
        }
        if self.out.ends_with('\n') {
            self.out.push('\n');
        } else {
            self.out.push_str("\n\n");
        }
    }

    fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html><head><title> Rust in 2025 </title><style>body{color:red}</style></head>
<body>
  <header><h1>Site Banner</h1></header>
  <nav><a href="/">Home</a></nav>
  <article>
    <h1>The Real Headline</h1>
    <p>First   paragraph with <b>bold</b> text.</p>
    <script>var x = 1;</script>
    <ul><li>one</li><li>two</li></ul>
    <pre>fn main() {
    println!("hi");
}</pre>
  </article>
  <footer>Copyright</footer>
</body></html>"#;

    #[test]
    fn extracts_article_text() {
        let doc = extract_html(PAGE, "https://blog.example.com/post/1").unwrap();
        assert_eq!(doc.source_type, SourceType::Url);
        assert!(doc.content.starts_with("The Real Headline"));
        assert!(doc.content.contains("First paragraph with bold text."));
        assert!(doc.content.contains("one\ntwo"));
        assert!(doc.content.contains("fn main() {\n println!(\"hi\");\n}"));
        assert!(!doc.content.contains("var x"));
        assert!(!doc.content.contains("Copyright"));
        assert!(!doc.content.contains("Site Banner"));
    }

    #[test]
    fn metadata_has_url_and_domain() {
        let doc = extract_html(PAGE, "https://blog.example.com/post/1").unwrap();
        assert_eq!(doc.meta("domain").and_then(|m| m.as_text()), Some("blog.example.com"));
        assert_eq!(
            doc.meta("url").and_then(|m| m.as_text()),
            Some("https://blog.example.com/post/1")
        );
    }

    #[test]
    fn title_prefers_title_tag() {
        let doc = extract_html(PAGE, "https://x.test/").unwrap();
        assert_eq!(doc.title.as_deref(), Some("Rust in 2025"));
    }

    #[test]
    fn title_falls_back_to_h1_outside_chrome() {
        let html = "<html><body><header><h1>Banner</h1></header>\
                    <main><h1>Actual</h1><p>Body text.</p></main></body></html>";
        let doc = extract_html(html, "https://x.test/").unwrap();
        assert_eq!(doc.title.as_deref(), Some("Actual"));
        assert!(doc.content.contains("Body text."));
    }

    #[test]
    fn no_title_is_none() {
        let doc = extract_html("<html><body><p>just text</p></body></html>", "https://x.test/")
            .unwrap();
        assert_eq!(doc.title, None);
    }

    #[test]
    fn main_used_when_no_article() {
        let html = "<html><body><div>outside</div><main><p>inside</p></main></body></html>";
        let doc = extract_html(html, "https://x.test/").unwrap();
        assert_eq!(doc.content, "inside");
    }

    #[test]
    fn container_inside_chrome_is_ignored() {
        let html = "<html><body><footer><article><p>Related: other post teaser</p></article></footer>\
                    <main><p>The real content of the page.</p></main></body></html>";
        let doc = extract_html(html, "https://x.test/").unwrap();
        assert_eq!(doc.content, "The real content of the page.");
    }

    #[test]
    fn empty_page_is_extraction_error() {
        let err = extract_html("<html><body><nav>menu</nav></body></html>", "https://x.test/")
            .unwrap_err();
        assert!(matches!(err, BlogError::Extraction { .. }));
    }

    // ── Fetching against a local server ──────────────────────────────────────

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response; `None` accepts and never answers.
    async fn serve_once(response: Option<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            match response {
                Some(r) => {
                    let _ = stream.write_all(r.as_bytes()).await;
                    let _ = stream.shutdown().await;
                }
                None => tokio::time::sleep(Duration::from_secs(30)).await,
            }
        });
        format!("http://{addr}/post")
    }

    fn extractor(timeout_secs: u64) -> WebExtractor {
        let config = BlogConfig::builder()
            .fetch_timeout_secs(timeout_secs)
            .build()
            .unwrap();
        WebExtractor::new(&config).unwrap()
    }

    #[tokio::test]
    async fn fetch_success_extracts_page() {
        let url = serve_once(Some(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 49\r\nConnection: close\r\n\r\n\
             <html><body><p>Served locally.</p></body></html>\n",
        ))
        .await;
        let doc = extractor(5).extract(&url).await.unwrap();
        assert_eq!(doc.content, "Served locally.");
        assert_eq!(doc.meta("domain").and_then(|m| m.as_text()), Some("127.0.0.1"));
    }

    #[tokio::test]
    async fn non_success_status_is_fetch_error() {
        let url = serve_once(Some(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        ))
        .await;
        let err = extractor(5).extract(&url).await.unwrap_err();
        match err {
            BlogError::Fetch { url: u, reason } => {
                assert_eq!(u, url);
                assert!(reason.contains("404"), "got: {reason}");
            }
            other => panic!("expected Fetch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let url = serve_once(None).await;
        let err = extractor(1).extract(&url).await.unwrap_err();
        match err {
            BlogError::Fetch { reason, .. } => {
                assert_eq!(reason, "timed out after 1s");
            }
            other => panic!("expected Fetch, got {other:?}"),
        }
    }
}
