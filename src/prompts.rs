//! Prompts for blog-post generation and refinement.
//!
//! Every prompt lives here so wording changes touch exactly one file and
//! tests can inspect prompts without a live provider. Callers can override
//! the system prompt via [`crate::config::BlogConfig::system_prompt`].

use crate::output::{MetaValue, SourceType};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Default system prompt. `{categories}` is replaced with the allowed set.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a skilled technical writer creating blog posts for a personal website about technology, graphics and AI.

Writing style:
- Clear, insightful, and accessible to both technical and non-technical readers
- Balance technical depth with readability
- Use concrete examples and analogies
- Forward-thinking but grounded in practical reality
- Avoid excessive jargon; explain complex concepts clearly

Content structure:
- Strong opening that hooks the reader
- Clear narrative flow with logical progression
- Use headers to organise ideas (##, ###)
- Put key insights in callout boxes
- End with forward-looking implications in a Trajectory section

Tone:
- Professional but approachable
- Thoughtful and analytical
- Honest about challenges and limitations

Special elements:
1. Callouts for key findings:
   > **Key Finding**
   > Important insight here

2. Pull quotes for emphasis (a single line):
   > *"A particularly insightful statement worth highlighting"*

3. A Trajectory section for future implications (heading, blank line, body):
   ## Trajectory

   Where this technology or idea is heading...

Output format (exactly this layout, no code fences):
TITLE: <blog post title>
CATEGORY: <one of: {categories}>
EXCERPT: <2-3 sentence summary for preview cards>
TAGS: <comma-separated tags>

---

<full blog post content in Markdown>"#;

/// Instruction block appended after the source material.
const REQUIREMENTS: &str = r#"Please create a compelling blog post based on this material.

Requirements:
1. Extract the key insights and present them clearly
2. Organise the content with a logical flow
3. Add appropriate headers, callouts, and formatting
4. Write an engaging introduction
5. Include a "Trajectory" section discussing future implications
6. Suggest relevant tags
7. Create a concise excerpt for preview

Remember to follow the style guide and the output format exactly.
"#;

/// Framing hint per source type, so the model knows what it is reading.
fn source_hint(source_type: SourceType) -> &'static str {
    match source_type {
        SourceType::Url => "a web article",
        SourceType::Pdf => "a PDF document",
        SourceType::ImageOcr => "OCR text from a screenshot (expect recognition errors)",
        SourceType::Transcript => "a spoken transcript (speaker labels and timestamps may appear)",
        SourceType::Text => "plain text notes",
    }
}

/// Render the system prompt for the given category set.
pub fn system_prompt(categories: &[String]) -> String {
    DEFAULT_SYSTEM_PROMPT.replace("{categories}", &categories.join(", "))
}

/// Build the user message for a generation request.
pub fn user_prompt(
    content: &str,
    source_type: SourceType,
    metadata: &BTreeMap<String, MetaValue>,
    instructions: Option<&str>,
    suggested_title: Option<&str>,
) -> String {
    let mut p = String::with_capacity(content.len() + 1024);
    p.push_str("Create a blog post from the following source material:\n\n");
    let _ = writeln!(
        p,
        "**Source Type:** {} ({})\n",
        source_type,
        source_hint(source_type)
    );

    let present: Vec<_> = metadata.iter().filter(|(_, v)| v.is_present()).collect();
    if !present.is_empty() {
        p.push_str("**Metadata:**\n");
        for (key, value) in present {
            let _ = writeln!(p, "- {key}: {value}");
        }
        p.push('\n');
    }

    if let Some(title) = suggested_title.filter(|t| !t.trim().is_empty()) {
        let _ = writeln!(p, "**Suggested Title:** {}\n", title.trim());
    }

    if let Some(extra) = instructions.filter(|t| !t.trim().is_empty()) {
        let _ = writeln!(p, "**Additional Instructions:** {}\n", extra.trim());
    }

    p.push_str("**Source Content:**\n\n---\n");
    p.push_str(content);
    p.push_str("\n---\n\n");
    p.push_str(REQUIREMENTS);
    p
}

/// Build the refine request. The reply is the replacement body only.
pub fn refine_prompt(current_body: &str, feedback: &str) -> String {
    format!(
        "Please refine the following blog post based on this feedback:\n\n\
         **Feedback:** {}\n\n\
         **Current Blog Post:**\n{}\n\n\
         **Instructions:**\n\
         - Address the feedback while maintaining the overall structure\n\
         - Keep the same writing style, tone and special elements\n\
         - Return only the refined blog post content (markdown), with no header block\n",
        feedback.trim(),
        current_body
    )
}
