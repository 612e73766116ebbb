//! Configuration for extraction, generation and rendering.
//!
//! One [`BlogConfig`] value is built at startup via [`BlogConfigBuilder`] and
//! passed by reference to every stage. Nothing in the library reads global
//! state except the provider auto-detection in
//! [`crate::pipeline::generate::resolve_provider`].

use crate::error::BlogError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Categories a generated post may be filed under.
pub const DEFAULT_CATEGORIES: [&str; 5] = ["Introduction", "Research", "Tutorial", "Analysis", "Vision"];

/// Browser-like agent string; many sites refuse bare HTTP clients.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Configuration for one blog-post run.
///
/// # Example
/// ```rust
/// use edgequake_blogpost::BlogConfig;
///
/// let config = BlogConfig::builder()
///     .author("Ada Lovelace")
///     .temperature(0.5)
///     .build()
///     .unwrap();
/// assert_eq!(config.words_per_minute, 200);
/// ```
#[derive(Clone)]
pub struct BlogConfig {
    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.7.
    pub temperature: f32,

    /// Maximum tokens for the generated post. Default: 4000.
    pub max_tokens: usize,

    /// Timeout for URL fetches in seconds. Default: 30.
    pub fetch_timeout_secs: u64,

    /// Timeout for one generation or refine call in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Images above this size are rejected before decoding. Default: 5 MiB.
    pub max_image_bytes: u64,

    /// Tesseract language code. Default: "eng".
    pub ocr_language: String,

    /// Tesseract executable. Default: "tesseract".
    pub tesseract_cmd: String,

    /// Author shown in the page header and footer.
    pub author: String,

    /// Reading speed used for the reading-time estimate. Default: 200.
    pub words_per_minute: u32,

    /// Closed set of allowed post categories.
    pub categories: Vec<String>,

    /// Category used when the model returns none or one outside `categories`.
    pub default_category: String,

    /// `User-Agent` header for URL fetches.
    pub user_agent: String,

    /// Custom system prompt. If None, uses the built-in blog prompt.
    pub system_prompt: Option<String>,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.7,
            max_tokens: 4000,
            fetch_timeout_secs: 30,
            api_timeout_secs: 120,
            max_image_bytes: 5 * 1024 * 1024,
            ocr_language: "eng".to_string(),
            tesseract_cmd: "tesseract".to_string(),
            author: "Anonymous".to_string(),
            words_per_minute: 200,
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            default_category: "Research".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            system_prompt: None,
        }
    }
}

impl fmt::Debug for BlogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlogConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("ocr_language", &self.ocr_language)
            .field("author", &self.author)
            .field("words_per_minute", &self.words_per_minute)
            .field("categories", &self.categories)
            .field("default_category", &self.default_category)
            .finish()
    }
}

impl BlogConfig {
    /// Create a new builder for `BlogConfig`.
    pub fn builder() -> BlogConfigBuilder {
        BlogConfigBuilder {
            config: Self::default(),
        }
    }

    /// Case-insensitive lookup in the allowed category set, returning the
    /// canonical spelling.
    pub fn canonical_category(&self, candidate: &str) -> Option<&str> {
        let candidate = candidate.trim();
        self.categories
            .iter()
            .find(|c| c.eq_ignore_ascii_case(candidate))
            .map(String::as_str)
    }
}

/// Builder for [`BlogConfig`].
#[derive(Debug)]
pub struct BlogConfigBuilder {
    config: BlogConfig,
}

impl BlogConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs.max(1);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn max_image_bytes(mut self, bytes: u64) -> Self {
        self.config.max_image_bytes = bytes;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.config.tesseract_cmd = cmd.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.config.author = author.into();
        self
    }

    pub fn words_per_minute(mut self, wpm: u32) -> Self {
        self.config.words_per_minute = wpm;
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.categories = categories
            .into_iter()
            .map(Into::into)
            .map(|c: String| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        self
    }

    pub fn default_category(mut self, category: impl Into<String>) -> Self {
        self.config.default_category = category.into();
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<BlogConfig, BlogError> {
        let c = &self.config;
        if c.words_per_minute == 0 {
            return Err(BlogError::InvalidConfig(
                "words per minute must be ≥ 1".into(),
            ));
        }
        if c.categories.is_empty() {
            return Err(BlogError::InvalidConfig(
                "at least one category is required".into(),
            ));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(BlogError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        let default = match c.canonical_category(&c.default_category) {
            Some(d) => d.to_string(),
            None => {
                return Err(BlogError::InvalidConfig(format!(
                    "default category '{}' is not one of: {}",
                    c.default_category,
                    c.categories.join(", ")
                )))
            }
        };
        self.config.default_category = default;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let c = BlogConfig::builder().build().unwrap();
        assert_eq!(c.temperature, 0.7);
        assert_eq!(c.max_tokens, 4000);
        assert_eq!(c.max_image_bytes, 5_242_880);
        assert_eq!(c.default_category, "Research");
        assert_eq!(c.categories.len(), 5);
    }

    #[test]
    fn zero_wpm_rejected() {
        let err = BlogConfig::builder().words_per_minute(0).build().unwrap_err();
        assert!(matches!(err, BlogError::InvalidConfig(_)));
    }

    #[test]
    fn default_category_must_be_allowed() {
        let err = BlogConfig::builder()
            .categories(["Notes", "Essays"])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Research"));

        let ok = BlogConfig::builder()
            .categories(["Notes", "Essays"])
            .default_category("essays")
            .build()
            .unwrap();
        assert_eq!(ok.default_category, "Essays");
    }

    #[test]
    fn canonical_category_ignores_case() {
        let c = BlogConfig::default();
        assert_eq!(c.canonical_category(" tutorial "), Some("Tutorial"));
        assert_eq!(c.canonical_category("Poetry"), None);
    }

    #[test]
    fn temperature_clamped() {
        let c = BlogConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn debug_hides_provider() {
        let s = format!("{:?}", BlogConfig::default());
        assert!(s.contains("BlogConfig"));
        assert!(s.contains("words_per_minute"));
    }
}
