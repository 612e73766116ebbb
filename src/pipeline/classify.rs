//! Source classification: decide which extractor handles an input reference.
//!
//! A reference is a URL when it parses with both a scheme and a host; that
//! check runs first, so a URL is never mistaken for a same-named local file.
//! Anything else must be an existing path and is routed by extension.

use crate::error::BlogError;
use crate::output::SourceKind;
use std::path::Path;
use tracing::debug;

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

/// Check if the input string is a URL with a non-empty scheme and host.
pub fn is_url(input: &str) -> bool {
    match url::Url::parse(input.trim()) {
        Ok(u) => !u.scheme().is_empty() && u.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

/// Classify by extension alone (case-insensitive). No extension is text.
pub fn kind_for_path(path: &Path) -> SourceKind {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => SourceKind::Pdf,
        Some(e) if IMAGE_EXTENSIONS.contains(&e) => SourceKind::Image,
        _ => SourceKind::Text,
    }
}

/// Classify an input reference.
///
/// # Errors
/// [`BlogError::NotFound`] when the reference is not a URL and no file
/// exists at that path.
pub fn classify(reference: &str) -> Result<SourceKind, BlogError> {
    if is_url(reference) {
        debug!("Classified '{}' as url", reference);
        return Ok(SourceKind::Url);
    }

    let path = Path::new(reference);
    if reference.is_empty() || !path.exists() {
        return Err(BlogError::NotFound {
            reference: reference.to_string(),
        });
    }

    let kind = kind_for_path(path);
    debug!("Classified '{}' as {}", reference, kind);
    Ok(kind)
}
