//! LLM interaction: build the blog prompts, call the provider, parse the reply.
//!
//! All prompt wording lives in [`crate::prompts`]; this module owns the call
//! itself (one request, bounded by `api_timeout_secs`, never retried) and the
//! reply grammar:
//!
//! ```text
//! TITLE: …
//! CATEGORY: …
//! EXCERPT: …
//! TAGS: a, b, c
//!
//! ---
//!
//! <markdown body>
//! ```

use crate::config::BlogConfig;
use crate::error::{BlogError, Result};
use crate::output::{ExtractedDocument, GeneratedPost, MetaValue, SourceType};
use crate::prompts;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Everything the generation service is told about the source.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub content: &'a str,
    pub source_type: SourceType,
    pub metadata: &'a BTreeMap<String, MetaValue>,
    pub instructions: Option<&'a str>,
    pub suggested_title: Option<&'a str>,
}

impl<'a> GenerationRequest<'a> {
    /// Request for a document, using its detected title as the suggestion.
    pub fn from_document(doc: &'a ExtractedDocument) -> Self {
        Self {
            content: &doc.content,
            source_type: doc.source_type,
            metadata: &doc.metadata,
            instructions: None,
            suggested_title: doc.title.as_deref(),
        }
    }

    pub fn with_instructions(mut self, instructions: Option<&'a str>) -> Self {
        self.instructions = instructions;
        self
    }

    /// An explicit title replaces the detected one.
    pub fn with_title(mut self, title: Option<&'a str>) -> Self {
        if title.is_some() {
            self.suggested_title = title;
        }
        self
    }
}

/// Drives generation and refinement against one provider.
pub struct Generator {
    provider: Arc<dyn LLMProvider>,
    config: BlogConfig,
}

impl Generator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &BlogConfig) -> Self {
        Self {
            provider,
            config: config.clone(),
        }
    }

    /// Resolve the provider from `config` and build a generator.
    pub async fn from_config(config: &BlogConfig) -> Result<Self> {
        let provider = resolve_provider(config).await?;
        Ok(Self::new(provider, config))
    }

    /// Generate a structured post from source material.
    pub async fn generate(&self, req: &GenerationRequest<'_>) -> Result<GeneratedPost> {
        let system = match self.config.system_prompt.as_deref() {
            Some(custom) => custom.replace("{categories}", &self.config.categories.join(", ")),
            None => prompts::system_prompt(&self.config.categories),
        };
        let user = prompts::user_prompt(
            req.content,
            req.source_type,
            req.metadata,
            req.instructions,
            req.suggested_title,
        );

        info!(
            "Generating post from {} source ({} chars)",
            req.source_type,
            req.content.len()
        );
        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
        let reply = self.call(&messages).await?;
        parse_reply(&reply, &self.config)
    }

    /// Rewrite `current_body` according to `feedback`; returns the new body.
    pub async fn refine(&self, current_body: &str, feedback: &str) -> Result<String> {
        info!("Refining post ({} chars)", current_body.len());
        let messages = vec![ChatMessage::user(prompts::refine_prompt(current_body, feedback))];
        let reply = self.call(&messages).await?;
        let body = strip_outer_fences(&reply).trim().to_string();
        if body.is_empty() {
            return Err(BlogError::Generation("refine reply was empty".into()));
        }
        Ok(body)
    }

    async fn call(&self, messages: &[ChatMessage]) -> Result<String> {
        let start = Instant::now();
        let options = build_options(&self.config);
        let secs = self.config.api_timeout_secs;

        let response = timeout(
            Duration::from_secs(secs),
            self.provider.chat(messages, Some(&options)),
        )
        .await
        .map_err(|_| BlogError::Generation(format!("API call timed out after {secs}s")))?
        .map_err(|e| {
            warn!("LLM call failed: {}", e);
            BlogError::Generation(e.to_string())
        })?;

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

/// Build `CompletionOptions` from the config.
fn build_options(config: &BlogConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

// ── Reply parsing ────────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?[ \t]*\n(.*)\n```\s*$").unwrap());

/// Models sometimes wrap the whole reply in a fence despite the prompt.
fn strip_outer_fences(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    }
}

#[derive(Default)]
struct Header {
    title: Option<String>,
    category: Option<String>,
    excerpt: Option<String>,
    tags: Option<Vec<String>>,
}

impl Header {
    fn any(&self) -> bool {
        self.title.is_some() || self.category.is_some() || self.excerpt.is_some() || self.tags.is_some()
    }
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parse a generation reply into a [`GeneratedPost`].
///
/// The separator is the first `---` line that follows at least one header
/// line. Without one, the whole reply is the body and the header fields stay
/// empty. The category always ends up in the allowed set: anything else
/// becomes `config.default_category`.
///
/// # Errors
/// [`BlogError::Generation`] if the body is empty.
pub fn parse_reply(reply: &str, config: &BlogConfig) -> Result<GeneratedPost> {
    let text = strip_outer_fences(&reply.replace("\r\n", "\n"));
    let lines: Vec<&str> = text.lines().collect();

    let mut header = Header::default();
    let mut body_start = None;

    for (i, line) in lines.iter().enumerate() {
        let l = line.trim();
        if let Some(v) = l.strip_prefix("TITLE:") {
            header.title = Some(v.trim().to_string());
        } else if let Some(v) = l.strip_prefix("CATEGORY:") {
            header.category = Some(v.trim().to_string());
        } else if let Some(v) = l.strip_prefix("EXCERPT:") {
            header.excerpt = Some(v.trim().to_string());
        } else if let Some(v) = l.strip_prefix("TAGS:") {
            header.tags = Some(split_tags(v));
        } else if l == "---" && header.any() {
            body_start = Some(i + 1);
            break;
        }
    }

    let (header, body) = match body_start {
        Some(start) => (header, lines[start..].join("\n").trim().to_string()),
        None => {
            debug!("Reply has no header separator; using it whole as the body");
            (Header::default(), text.trim().to_string())
        }
    };

    if body.is_empty() {
        return Err(BlogError::Generation("reply contained no post body".into()));
    }

    let category = header
        .category
        .as_deref()
        .and_then(|c| config.canonical_category(c))
        .unwrap_or(&config.default_category)
        .to_string();

    Ok(GeneratedPost {
        title: header.title.unwrap_or_default(),
        category,
        excerpt: header.excerpt.unwrap_or_default(),
        tags: header.tags.unwrap_or_default(),
        content: body,
    })
}

// ── Provider resolution ──────────────────────────────────────────────────────

/// Model used when a provider is named without one.
pub fn default_model(provider: &str) -> &'static str {
    match provider {
        "anthropic" => "claude-sonnet-4-20250514",
        "gemini" => "gemini-2.0-flash",
        "ollama" => "llama3.2",
        "mistral" => "mistral-large-latest",
        _ => "gpt-4.1-mini",
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        BlogError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`)
/// 2. **Named provider + model** (`config.provider_name`, `config.model`)
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`)
/// 4. **Anthropic key** (`ANTHROPIC_API_KEY`), the historical default
/// 5. **Full auto-detection** (`ProviderFactory::from_env`)
pub async fn resolve_provider(config: &BlogConfig) -> Result<Arc<dyn LLMProvider>> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or_else(|| default_model(name));
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if std::env::var("ANTHROPIC_API_KEY").is_ok_and(|k| !k.is_empty()) {
        let model = config
            .model
            .as_deref()
            .unwrap_or_else(|| default_model("anthropic"));
        return create_provider("anthropic", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| BlogError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set ANTHROPIC_API_KEY, OPENAI_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> BlogConfig {
        BlogConfig::default()
    }

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&cfg());
        assert_eq!(opts.temperature, Some(0.7));
        assert_eq!(opts.max_tokens, Some(4000));
    }

    #[test]
    fn parses_full_reply() {
        let reply = "TITLE: Rendering at Scale\nCATEGORY: Analysis\nEXCERPT: Short summary.\nTAGS: gpu, rendering , ,vfx\n\n---\n\n## Intro\n\nBody text.\n";
        let post = parse_reply(reply, &cfg()).unwrap();
        assert_eq!(post.title, "Rendering at Scale");
        assert_eq!(post.category, "Analysis");
        assert_eq!(post.excerpt, "Short summary.");
        assert_eq!(post.tags, vec!["gpu", "rendering", "vfx"]);
        assert_eq!(post.content, "## Intro\n\nBody text.");
    }

    #[test]
    fn missing_separator_means_whole_body() {
        let reply = "TITLE: Orphan\nJust some text without the separator.";
        let post = parse_reply(reply, &cfg()).unwrap();
        assert_eq!(post.title, "");
        assert!(post.tags.is_empty());
        assert_eq!(post.content, reply);
        assert_eq!(post.category, "Research");
    }

    #[test]
    fn leading_rule_without_header_is_body() {
        let reply = "Intro line\n\n---\n\nMore text";
        let post = parse_reply(reply, &cfg()).unwrap();
        assert_eq!(post.content, reply);
    }

    #[test]
    fn unknown_category_falls_back() {
        let reply = "TITLE: T\nCATEGORY: Poetry\n---\nBody";
        assert_eq!(parse_reply(reply, &cfg()).unwrap().category, "Research");
        let reply = "TITLE: T\nCATEGORY: tutorial\n---\nBody";
        assert_eq!(parse_reply(reply, &cfg()).unwrap().category, "Tutorial");
    }

    #[test]
    fn bracketed_tags_and_fences() {
        let reply = "```markdown\nTITLE: T\nTAGS: [ai, ml]\n---\nBody\n```";
        let post = parse_reply(reply, &cfg()).unwrap();
        assert_eq!(post.tags, vec!["ai", "ml"]);
        assert_eq!(post.content, "Body");
    }

    #[test]
    fn empty_body_is_generation_error() {
        let err = parse_reply("TITLE: T\n---\n   \n", &cfg()).unwrap_err();
        assert!(matches!(err, BlogError::Generation(_)));
        assert!(parse_reply("", &cfg()).is_err());
    }

    #[test]
    fn body_keeps_later_rules() {
        let reply = "TITLE: T\n---\nPart one\n\n---\n\nPart two";
        let post = parse_reply(reply, &cfg()).unwrap();
        assert_eq!(post.content, "Part one\n\n---\n\nPart two");
    }

    #[test]
    fn request_title_override() {
        let doc = ExtractedDocument::new("text", SourceType::Text, BTreeMap::new(), Some("Detected".into()))
            .unwrap();
        let req = GenerationRequest::from_document(&doc).with_title(None);
        assert_eq!(req.suggested_title, Some("Detected"));
        let req = req.with_title(Some("Chosen"));
        assert_eq!(req.suggested_title, Some("Chosen"));
    }

    #[test]
    fn default_models() {
        assert!(default_model("anthropic").starts_with("claude"));
        assert_eq!(default_model("unknown"), "gpt-4.1-mini");
    }
}
