//! # edgequake-blogpost
//!
//! Turn source material (web articles, PDFs, screenshots, transcripts and
//! notes) into a finished blog post: an LLM drafts the post, the crate renders
//! it to a self-contained HTML page with the site's callouts, pull quotes and
//! Trajectory section.
//!
//! ## Pipeline Overview
//!
//! ```text
//! reference (URL or path)
//!  │
//!  ├─ 1. Classify  URL / PDF / image / text by scheme and extension
//!  ├─ 2. Extract   readable text + metadata (HTTP, pdfium/lopdf, tesseract)
//!  ├─ 3. Generate  one LLM call → title, category, excerpt, tags, body
//!  ├─ 4. Review    optional refine rounds (CLI loop)
//!  ├─ 5. Render    block grammar + markdown → HTML page
//!  └─ 6. Publish   <stem>.html + <stem>.md sidecar, written atomically
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_blogpost::{extract, generate_post, publish, BlogConfig, PublishOptions};
//! use edgequake_blogpost::pipeline::generate::Generator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from EDGEQUAKE_LLM_PROVIDER / ANTHROPIC_API_KEY / …
//!     let config = BlogConfig::default();
//!     let doc = extract("notes.txt", &config).await?;
//!     let generator = Generator::from_config(&config).await?;
//!     let post = generate_post(&generator, &doc, None, None).await?;
//!     let paths = publish(&post, &PublishOptions::default(), None, &config).await?;
//!     println!("{}", paths.html.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `blogpost` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-blogpost = { version = "0.1", default-features = false }
//! ```
//!
//! ## External tools
//!
//! | Source | Needs |
//! |--------|-------|
//! | PDF    | libpdfium at runtime (`PDFIUM_LIB_PATH`); falls back to a pure-Rust reader |
//! | Image  | `tesseract` on `PATH` (or `BLOGPOST_TESSERACT`) |
//! | URL    | network access |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod sidecar;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BlogConfig, BlogConfigBuilder, DEFAULT_CATEGORIES};
pub use convert::{
    convert_markdown_file, extract, generate_post, publish, refine_post, render_post,
    PublishOptions, PublishedPaths,
};
pub use error::{BlogError, ErrorKind, Result};
pub use output::{
    ExtractedDocument, GeneratedPost, MetaValue, RenderedDocument, SourceKind, SourceType,
};
