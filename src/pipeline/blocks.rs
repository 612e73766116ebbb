//! Special-block grammar: callouts, pull quotes and the Trajectory section.
//!
//! Generated posts use three markdown conventions that plain CommonMark would
//! render as ordinary blockquotes or headings:
//!
//! ```text
//! > **Key Finding**            →  <div class="callout"><h4>…</h4><p>…</p></div>
//! > Body line one.
//!
//! > *"A quotable line."*       →  <p class="pull-quote">"…"</p>
//!
//! ## Trajectory                →  <div class="trajectory"><h3>Trajectory</h3>…</div>
//!
//! Where this goes next…
//! ```
//!
//! ## Span resolution
//!
//! Each [`BlockMatcher`] scans the untouched source once and proposes spans.
//! Matchers run in a fixed order (callout, pull quote, trajectory) and a
//! proposal is accepted only if it overlaps nothing accepted so far. The one
//! exception is a container (the trajectory section), which may swallow spans
//! it fully contains; its body is processed recursively so those blocks are
//! still rendered, inside it. All accepted spans are then spliced into the
//! source in one pass, so no matcher ever sees another's output.
//!
//! Anything malformed (a bold header with no quoted body, a trajectory
//! heading with nothing under it) simply produces no span and falls through
//! to generic markdown conversion.

use crate::pipeline::markdown::{render_inline, to_html};
use once_cell::sync::Lazy;
use regex::Regex;

/// Which grammar rule produced a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Callout,
    PullQuote,
    Trajectory,
}

impl BlockKind {
    fn is_container(self) -> bool {
        matches!(self, BlockKind::Trajectory)
    }
}

/// A byte range of the source and the HTML fragment that replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpan {
    pub kind: BlockKind,
    pub start: usize,
    pub end: usize,
    pub html: String,
}

impl BlockSpan {
    fn overlaps(&self, other: &BlockSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    fn contains(&self, other: &BlockSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// One grammar rule.
pub trait BlockMatcher: Sync {
    fn kind(&self) -> BlockKind;

    /// All candidate spans in `source`, in source order, non-overlapping
    /// among themselves.
    fn find(&self, source: &str) -> Vec<BlockSpan>;
}

// ── Callout ──────────────────────────────────────────────────────────────────

static RE_CALLOUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^> \*\*(.+?)\*\*[ \t]*\n((?:> .+(?:\n|$))+)").unwrap()
});

/// `> **Header**` followed by one or more `> text` lines.
pub struct CalloutMatcher;

impl BlockMatcher for CalloutMatcher {
    fn kind(&self) -> BlockKind {
        BlockKind::Callout
    }

    fn find(&self, source: &str) -> Vec<BlockSpan> {
        RE_CALLOUT
            .captures_iter(source)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let header = caps[1].trim();
                let body = caps[2]
                    .lines()
                    .map(|l| l.strip_prefix("> ").unwrap_or(l).trim())
                    .filter(|l| !l.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                if header.is_empty() || body.is_empty() {
                    return None;
                }
                Some(BlockSpan {
                    kind: BlockKind::Callout,
                    start: whole.start(),
                    end: whole.end(),
                    html: format!(
                        "<div class=\"callout\"><h4>{}</h4><p>{}</p></div>",
                        render_inline(header),
                        render_inline(&body)
                    ),
                })
            })
            .collect()
    }
}

// ── Pull quote ───────────────────────────────────────────────────────────────

static RE_PULL_QUOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^> \*"(.+?)"\*[ \t]*$"#).unwrap());

/// A single `> *"Quote"*` line.
pub struct PullQuoteMatcher;

impl BlockMatcher for PullQuoteMatcher {
    fn kind(&self) -> BlockKind {
        BlockKind::PullQuote
    }

    fn find(&self, source: &str) -> Vec<BlockSpan> {
        RE_PULL_QUOTE
            .captures_iter(source)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let quote = caps[1].trim();
                if quote.is_empty() {
                    return None;
                }
                Some(BlockSpan {
                    kind: BlockKind::PullQuote,
                    start: whole.start(),
                    end: whole.end(),
                    html: format!("<p class=\"pull-quote\">\"{}\"</p>", render_inline(quote)),
                })
            })
            .collect()
    }
}

// ── Trajectory ───────────────────────────────────────────────────────────────

static RE_TRAJECTORY_HEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^## Trajectory[ \t]*\n[ \t]*\n").unwrap());
static RE_H2: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^##[ \t]").unwrap());

/// `## Trajectory`, a blank line, then everything up to the next level-2
/// heading or the end of the document.
pub struct TrajectoryMatcher;

impl BlockMatcher for TrajectoryMatcher {
    fn kind(&self) -> BlockKind {
        BlockKind::Trajectory
    }

    fn find(&self, source: &str) -> Vec<BlockSpan> {
        let mut spans = Vec::new();
        let mut from = 0;
        while let Some(head) = RE_TRAJECTORY_HEAD.find_at(source, from) {
            let body_start = head.end();
            let body_end = RE_H2
                .find_at(source, body_start)
                .map(|m| m.start())
                .unwrap_or(source.len());
            from = body_end.max(body_start);

            let body = &source[body_start..body_end];
            if body.trim().is_empty() {
                continue;
            }
            let inner = to_html(&process(body));
            spans.push(BlockSpan {
                kind: BlockKind::Trajectory,
                start: head.start(),
                end: body_end,
                html: format!(
                    "<div class=\"trajectory\"><h3>Trajectory</h3>\n{}</div>",
                    inner.trim_end()
                ),
            });
            if from >= source.len() {
                break;
            }
        }
        spans
    }
}

// ── Processing ───────────────────────────────────────────────────────────────

static MATCHERS: [&dyn BlockMatcher; 3] = [&CalloutMatcher, &PullQuoteMatcher, &TrajectoryMatcher];

/// Resolve candidate spans from every matcher, in matcher order.
pub fn resolve_spans(source: &str) -> Vec<BlockSpan> {
    let mut accepted: Vec<BlockSpan> = Vec::new();

    for matcher in MATCHERS.iter() {
        for candidate in matcher.find(source) {
            let overlapping: Vec<usize> = accepted
                .iter()
                .enumerate()
                .filter(|(_, a)| a.overlaps(&candidate))
                .map(|(i, _)| i)
                .collect();

            if overlapping.is_empty() {
                accepted.push(candidate);
            } else if candidate.kind.is_container()
                && overlapping.iter().all(|&i| candidate.contains(&accepted[i]))
            {
                accepted.retain(|a| !candidate.contains(a));
                accepted.push(candidate);
            }
        }
    }

    accepted.sort_by_key(|s| s.start);
    accepted
}

static RE_BLANK_IN_FRAGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n([ \t]*)\n").unwrap());

/// A CommonMark HTML block ends at the first blank line, so blank lines inside
/// a fragment (e.g. in a `<pre>`) are replaced by a newline entity.
fn seal_fragment(html: &str) -> String {
    RE_BLANK_IN_FRAGMENT
        .replace_all(html, "\n$1&#10;")
        .into_owned()
}

/// Rewrite every special block in `markdown` to an HTML fragment, leaving the
/// rest untouched for generic conversion.
///
/// CRLF and lone CR line endings are converted to `\n` first.
pub fn process(markdown: &str) -> String {
    let unified;
    let markdown = if markdown.contains('\r') {
        unified = markdown.replace("\r\n", "\n").replace('\r', "\n");
        unified.as_str()
    } else {
        markdown
    };

    let spans = resolve_spans(markdown);
    if spans.is_empty() {
        return markdown.to_string();
    }

    let mut out = String::with_capacity(markdown.len() + spans.len() * 64);
    let mut cursor = 0;
    for span in &spans {
        out.push_str(&markdown[cursor..span.start]);
        out.push('\n');
        out.push_str(&seal_fragment(&span.html));
        out.push_str("\n\n");
        cursor = span.end;
    }
    out.push_str(&markdown[cursor..]);
    out
}

/// Grammar pass followed by generic markdown conversion.
pub fn render_body(markdown: &str) -> String {
    to_html(&process(markdown))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callout_scenario() {
        let html = render_body("> **Key Finding**\n> Graphics pipelines are converging.\n");
        assert!(
            html.contains(
                "<div class=\"callout\"><h4>Key Finding</h4><p>Graphics pipelines are converging.</p></div>"
            ),
            "got: {html}"
        );
        assert!(!html.contains("<blockquote>"));
    }

    #[test]
    fn crlf_source_still_matches() {
        let html = render_body("> **Key Finding**\r\n> Body.\r\n\r\n## Trajectory\r\n\r\nNext.\r\n");
        assert!(
            html.contains("<div class=\"callout\"><h4>Key Finding</h4><p>Body.</p></div>"),
            "got: {html}"
        );
        assert!(html.contains("<div class=\"trajectory\">"), "got: {html}");
        assert!(!html.contains("<blockquote>"));
    }

    #[test]
    fn callout_body_lines_joined() {
        let spans = CalloutMatcher.find("> **Note**\n> line one\n>  \n> line two\n");
        // the whitespace-only quoted line is part of the block but dropped
        assert_eq!(spans.len(), 1);
        assert!(spans[0].html.contains("<p>line one line two</p>"), "got: {}", spans[0].html);
    }

    #[test]
    fn pull_quote_renders() {
        let html = render_body("Intro.\n\n> *\"Code is read more than written.\"*\n\nOutro.");
        assert!(html.contains("<p class=\"pull-quote\">\"Code is read more than written.\"</p>"));
        assert!(html.contains("<p>Intro.</p>"));
        assert!(html.contains("<p>Outro.</p>"));
    }

    #[test]
    fn callout_then_pull_quote_are_separate() {
        let src = "> **Key Finding**\n> Body text.\n\n> *\"Quote\"*\n";
        let spans = resolve_spans(src);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].kind, BlockKind::Callout);
        assert_eq!(spans[1].kind, BlockKind::PullQuote);
    }

    #[test]
    fn pull_quote_inside_callout_is_discarded() {
        let src = "> **Header**\n> *\"nested\"*\n";
        let spans = resolve_spans(src);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, BlockKind::Callout);
    }

    #[test]
    fn header_without_body_falls_through() {
        let src = "> **Lonely Header**\n\nParagraph.";
        assert!(resolve_spans(src).is_empty());
        assert_eq!(process(src), src);
        let html = render_body(src);
        assert!(html.contains("<blockquote>"));
    }

    #[test]
    fn trajectory_wraps_until_next_h2() {
        let src = "## Intro\n\nHello.\n\n## Trajectory\n\nWhere this goes.\n\nMore ahead.\n\n## Appendix\n\nEnd.";
        let html = render_body(src);
        let start = html.find("<div class=\"trajectory\"><h3>Trajectory</h3>").unwrap();
        let end = html[start..].find("</div>").unwrap() + start;
        let inner = &html[start..end];
        assert!(inner.contains("<p>Where this goes.</p>"));
        assert!(inner.contains("<p>More ahead.</p>"));
        assert!(!inner.contains("Appendix"));
        assert!(html.contains("<h2>Appendix</h2>"));
        assert!(html.contains("<h2>Intro</h2>"));
    }

    #[test]
    fn trajectory_runs_to_end_and_nests_blocks() {
        let src = "## Trajectory\n\nNext steps.\n\n> **Watch**\n> GPUs everywhere.\n\n### Detail\n\nStill inside.\n";
        let spans = resolve_spans(src);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, BlockKind::Trajectory);
        let html = render_body(src);
        assert!(html.contains("<div class=\"callout\"><h4>Watch</h4><p>GPUs everywhere.</p></div>"));
        assert!(html.contains("<h3>Detail</h3>"));
        assert!(html.trim_end().ends_with("</div>"), "got: {html}");
    }

    #[test]
    fn empty_trajectory_left_alone() {
        let src = "## Trajectory\n\n## Next\n\nText.";
        assert!(resolve_spans(src).is_empty());
        assert!(render_body(src).contains("<h2>Trajectory</h2>"));
    }

    #[test]
    fn trajectory_needs_blank_line() {
        let src = "## Trajectory\nImmediately.\n";
        assert!(TrajectoryMatcher.find(src).is_empty());
    }

    #[test]
    fn header_text_is_escaped() {
        let html = render_body("> **A <b> & B**\n> body\n");
        assert!(html.contains("<h4>A &lt;b&gt; &amp; B</h4>"), "got: {html}");
    }

    #[test]
    fn code_blocks_in_trajectory_survive_blank_lines() {
        let src = "## Trajectory\n\n```\nline one\n\nline three\n```\n";
        let html = render_body(src);
        assert!(html.contains("line one\n&#10;line three"), "got: {html}");
        assert!(!html.contains("<p>line three"));
    }

    #[test]
    fn seal_replaces_blank_lines() {
        assert_eq!(seal_fragment("a\n\nb"), "a\n&#10;b");
        assert_eq!(seal_fragment("a\n  \nb"), "a\n  &#10;b");
        assert_eq!(seal_fragment("a\nb"), "a\nb");
    }

    #[test]
    fn no_blocks_is_identity() {
        let src = "# Title\n\nJust a paragraph.\n\n> ordinary quote\n";
        assert_eq!(process(src), src);
    }
}
