//! Pipeline stages for source-to-post conversion.
//!
//! Each submodule implements one step. Only [`extract`] and [`generate`]
//! perform I/O; everything after generation is pure text transformation.
//!
//! ## Data Flow
//!
//! ```text
//! classify ──▶ extract ──▶ normalize ──▶ generate ──▶ render
//! (URL/ext)   (web/pdf/    (cleanup)    (LLM reply    (blocks → markdown
//!              image/text)               → post)       → page template)
//! ```
//!
//! 1. [`classify`]:  decide which extractor handles a reference
//! 2. [`extract`]:   turn a URL, PDF, image or text file into plain text
//! 3. [`normalize`]: deterministic whitespace cleanup every extractor applies
//! 4. [`generate`]:  prompt the provider and parse its structured reply
//! 5. [`blocks`]:    recognise callouts, pull quotes and the Trajectory section
//! 6. [`markdown`]:  CommonMark to HTML for everything else
//! 7. [`render`]:    slug, reading time, date and the full page

pub mod blocks;
pub mod classify;
pub mod extract;
pub mod generate;
pub mod markdown;
pub mod normalize;
pub mod render;
