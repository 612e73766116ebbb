//! Text normalization shared by every extractor.
//!
//! Extracted text arrives with whatever whitespace the source happened to
//! use: PDF text runs padded with spaces, HTML with blank lines between every
//! block, OCR output with stray NULs. A small ordered set of pure rules turns
//! all of it into one canonical shape before anything else sees it.
//!
//! ## Rule Order
//!
//! Line endings are unified first so the blank-line rule sees only `\n`.
//! Space collapsing runs after blank-line collapsing so whitespace-only lines
//! are already gone, and trimming runs last. The result is idempotent:
//! `normalize(normalize(x)) == normalize(x)`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all normalization rules.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Remove NUL characters
/// 3. Replace the private-use bullet U+F0B7 with `•`
/// 4. Collapse 3+ newlines (with any whitespace between) to exactly two
/// 5. Collapse runs of spaces to one
/// 6. Trim the whole text
pub fn normalize(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_nul(&s);
    let s = fix_private_bullet(&s);
    let s = collapse_blank_lines(&s);
    let s = collapse_spaces(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove NUL ───────────────────────────────────────────────────────

fn remove_nul(input: &str) -> String {
    input.replace('\0', "")
}

// ── Rule 3: Private-use bullet ───────────────────────────────────────────────

/// Symbol-font bullets from Word exports land in the private-use area.
fn fix_private_bullet(input: &str) -> String {
    input.replace('\u{F0B7}', "•")
}

// ── Rule 4: Collapse blank lines ─────────────────────────────────────────────

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n\s*\n+").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n").to_string()
}

// ── Rule 5: Collapse spaces ──────────────────────────────────────────────────

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

fn collapse_spaces(input: &str) -> String {
    RE_SPACES.replace_all(input, " ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_blank_runs() {
        assert_eq!(normalize("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalize("a\n \n\t\n  \nb"), "a\n\nb");
        assert_eq!(normalize("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn collapses_spaces_not_newlines() {
        assert_eq!(normalize("a    b\nc"), "a b\nc");
    }

    #[test]
    fn strips_nul_and_fixes_bullet() {
        assert_eq!(normalize("\u{F0B7} item\0"), "• item");
    }

    #[test]
    fn crlf_to_lf() {
        assert_eq!(normalize("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn trims_outer_whitespace() {
        assert_eq!(normalize("\n\n  text  \n\n"), "text");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn idempotent_on_mixed_input() {
        let messy = " \r\n x  \n \n\n\n\ty \u{F0B7}\0  z \n";
        let once = normalize(messy);
        assert_eq!(normalize(&once), once);
    }
}
