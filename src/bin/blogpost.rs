//! CLI binary for edgequake-blogpost.
//!
//! A thin shim over the library crate that maps CLI flags to `BlogConfig`,
//! drives the interactive review loop and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_blogpost::pipeline::extract::pdf::pdfium_available;
use edgequake_blogpost::pipeline::generate::{resolve_provider, Generator};
use edgequake_blogpost::pipeline::render::format_date;
use edgequake_blogpost::{
    convert_markdown_file, extract, generate_post, publish, refine_post, BlogConfig, BlogError,
    ErrorKind, GeneratedPost, PublishOptions, DEFAULT_CATEGORIES,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Spinner ──────────────────────────────────────────────────────────────────

/// Steady-tick spinner for one stage; hidden in quiet mode.
fn spinner(prefix: &'static str, msg: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix(prefix);
    bar.set_message(msg.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Draft a post from a web article, review it, then publish
  blogpost generate https://example.com/article

  # From a PDF, with a steer for the writer and a fixed title
  blogpost generate paper.pdf -p "focus on the benchmark results" -t "Fast Enough"

  # From a screenshot (needs tesseract), non-interactive, into a directory
  blogpost generate shot.png --no-edit -o site/

  # Re-render a hand-edited sidecar without calling the LLM
  blogpost convert site/essay-fast-enough.md

  # Inspect what an extractor sees (no API key needed)
  blogpost extract transcript.txt --json

  # Check providers and external tools
  blogpost check

SOURCES:
  http(s)://…          web article (article > main > body)
  .pdf                 PDF text layer (pdfium, pure-Rust fallback)
  .png .jpg .jpeg      screenshot OCR via tesseract
  .gif .bmp .tiff
  anything else        UTF-8 text; transcripts are detected automatically

POST MARKUP:
  > **Key Finding**            callout (bold heading + quoted body)
  > Body text

  > *"Worth quoting."*         pull quote (single line)

  ## Trajectory                forward-looking section, runs to the next ##

  Where this is heading…

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY       Anthropic API key (default provider when set)
  OPENAI_API_KEY          OpenAI API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (with EDGEQUAKE_MODEL)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (optional)
  BLOGPOST_*              Every flag below has a BLOGPOST_ variable
"#;

/// Turn articles, PDFs, screenshots and notes into finished blog posts.
#[derive(Parser, Debug)]
#[command(
    name = "blogpost",
    version,
    about = "Turn articles, PDFs, screenshots and notes into finished blog posts",
    long_about = "Extract source material, draft a blog post with an LLM, review and refine \
it interactively, then render a self-contained HTML page plus a markdown sidecar. Supports \
Anthropic, OpenAI, Google Gemini and any provider edgequake-llm can reach.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    config: ConfigArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "BLOGPOST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "BLOGPOST_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a source, generate a post, review it and publish.
    Generate {
        /// URL or local file (PDF, image, text).
        input: String,

        /// Extra instructions for the writer.
        #[arg(short = 'p', long = "prompt")]
        prompt: Option<String>,

        /// Use this title instead of the generated one.
        #[arg(short, long)]
        title: Option<String>,

        /// Force a category (must be one of --categories).
        #[arg(short, long)]
        category: Option<String>,

        /// Output directory, or file path whose extension is replaced.
        #[arg(short, long, env = "BLOGPOST_OUTPUT")]
        output: Option<PathBuf>,

        /// Publication date, YYYY-MM-DD (default: today).
        #[arg(long)]
        date: Option<String>,

        /// Link to the previous post.
        #[arg(long)]
        prev: Option<String>,

        /// Link to the next post.
        #[arg(long)]
        next: Option<String>,

        /// Skip the interactive review loop.
        #[arg(long, env = "BLOGPOST_NO_EDIT")]
        no_edit: bool,
    },

    /// Render a markdown file (with optional front matter) to HTML.
    Convert {
        /// Markdown or sidecar file.
        markdown: PathBuf,

        /// Output HTML path or directory (default: next to the input).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print what an extractor sees for a source (no API key needed).
    Extract {
        /// URL or local file.
        input: String,

        /// Output the extracted document as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Report which providers and external tools are available.
    Check,
}

/// Settings shared by every subcommand.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// LLM model ID (e.g. claude-sonnet-4-20250514, gpt-4.1).
    #[arg(long, global = true, env = "BLOGPOST_MODEL")]
    model: Option<String>,

    /// LLM provider: anthropic, openai, gemini, ollama, azure.
    #[arg(
        long,
        global = true,
        env = "BLOGPOST_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: anthropic, openai, gemini, azure, ollama."
    )]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "BLOGPOST_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, global = true, env = "BLOGPOST_MAX_TOKENS", default_value_t = 4000)]
    max_tokens: usize,

    /// HTTP fetch timeout in seconds.
    #[arg(long, global = true, env = "BLOGPOST_FETCH_TIMEOUT", default_value_t = 30)]
    fetch_timeout: u64,

    /// LLM call timeout in seconds.
    #[arg(long, global = true, env = "BLOGPOST_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Largest image accepted for OCR, in bytes.
    #[arg(long, global = true, env = "BLOGPOST_MAX_IMAGE_BYTES", default_value_t = 5 * 1024 * 1024)]
    max_image_bytes: u64,

    /// Tesseract language code(s), e.g. eng or eng+deu.
    #[arg(long, global = true, env = "BLOGPOST_OCR_LANGUAGE", default_value = "eng")]
    ocr_language: String,

    /// Tesseract executable.
    #[arg(long, global = true, env = "BLOGPOST_TESSERACT", default_value = "tesseract")]
    tesseract: String,

    /// Author shown in the page head.
    #[arg(long, global = true, env = "BLOGPOST_AUTHOR")]
    author: Option<String>,

    /// Reading speed for the "N min read" label.
    #[arg(long, global = true, env = "BLOGPOST_WORDS_PER_MINUTE", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(1..))]
    words_per_minute: u32,

    /// Allowed categories, comma separated.
    #[arg(long, global = true, env = "BLOGPOST_CATEGORIES", value_delimiter = ',')]
    categories: Vec<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, global = true, env = "BLOGPOST_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = log_filter(cli.verbose, cli.quiet);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

/// Default filter directive when `RUST_LOG` is unset.
fn log_filter(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    }
}

/// Reject a malformed `--date` before any extraction or LLM call.
fn check_date(date: Option<&str>) -> Result<()> {
    if let Some(d) = date {
        format_date(d).with_context(|| format!("Invalid --date '{d}'"))?;
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli.config).await?;
    let quiet = cli.quiet;

    match cli.command {
        Command::Generate {
            input,
            prompt,
            title,
            category,
            output,
            date,
            prev,
            next,
            no_edit,
        } => {
            check_date(date.as_deref())?;
            let forced_category = match category {
                Some(c) => Some(
                    config
                        .canonical_category(&c)
                        .map(str::to_string)
                        .ok_or_else(|| {
                            BlogError::Validation(format!(
                                "unknown category '{}' (allowed: {})",
                                c,
                                config.categories.join(", ")
                            ))
                        })?,
                ),
                None => None,
            };
            let start = Instant::now();

            let bar = spinner("Extracting", &input, quiet);
            let doc = extract(&input, &config).await;
            bar.finish_and_clear();
            let doc = doc.context("Extraction failed")?;
            if !quiet {
                eprintln!(
                    "{} {} source, {} words",
                    green("✓"),
                    doc.source_type,
                    bold(&doc.word_count().to_string())
                );
            }

            let generator = Generator::from_config(&config)
                .await
                .context("Could not set up the LLM provider")?;

            let bar = spinner("Generating", "drafting post…", quiet);
            let post = generate_post(&generator, &doc, prompt.as_deref(), title.as_deref()).await;
            bar.finish_and_clear();
            let mut post = post.context("Generation failed")?;
            if let Some(c) = forced_category {
                post.category = c;
            }

            let interactive = !no_edit && !quiet && io::stdin().is_terminal();
            if interactive && !review(&mut post, &generator, &config, quiet).await? {
                eprintln!("{}", yellow("Discarded; nothing written."));
                return Ok(());
            }

            let opts = PublishOptions {
                date,
                prev_link: prev,
                next_link: next,
            };
            let paths = publish(&post, &opts, output.as_deref(), &config)
                .await
                .context("Publishing failed")?;

            if !quiet {
                eprintln!(
                    "{}  {}  {}ms",
                    green("✔"),
                    bold(&post.title),
                    start.elapsed().as_millis()
                );
                eprintln!("   {} {}", dim("html:"), paths.html.display());
                eprintln!("   {} {}", dim("markdown:"), paths.sidecar.display());
            }
            println!("{}", paths.html.display());
        }

        Command::Convert { markdown, output } => {
            let out = convert_markdown_file(&markdown, output.as_deref(), &config)
                .await
                .with_context(|| format!("Failed to convert {}", markdown.display()))?;
            if !quiet {
                eprintln!("{} {}", green("✔"), out.display());
            }
            println!("{}", out.display());
        }

        Command::Extract { input, json } => {
            let bar = spinner("Extracting", &input, quiet || json);
            let doc = extract(&input, &config).await;
            bar.finish_and_clear();
            let doc = doc.context("Extraction failed")?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&doc).context("Failed to serialise document")?
                );
            } else {
                println!("Source type:  {}", doc.source_type);
                if let Some(ref t) = doc.title {
                    println!("Title:        {}", t);
                }
                for (key, value) in &doc.metadata {
                    println!("{:<13} {}", format!("{key}:"), value);
                }
                println!("Words:        {}", doc.word_count());
                println!();
                println!("{}", doc.content);
            }
        }

        Command::Check => check(&config).await,
    }

    Ok(())
}

/// Map CLI args to `BlogConfig`.
async fn build_config(args: &ConfigArgs) -> Result<BlogConfig> {
    let system_prompt = if let Some(ref path) = args.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = BlogConfig::builder()
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .fetch_timeout_secs(args.fetch_timeout)
        .api_timeout_secs(args.api_timeout)
        .max_image_bytes(args.max_image_bytes)
        .ocr_language(&args.ocr_language)
        .tesseract_cmd(&args.tesseract)
        .words_per_minute(args.words_per_minute);

    if let Some(ref m) = args.model {
        builder = builder.model(m);
    }
    if let Some(ref p) = args.provider {
        builder = builder.provider_name(p);
    }
    if let Some(ref a) = args.author {
        builder = builder.author(a);
    }
    if let Some(p) = system_prompt {
        builder = builder.system_prompt(p);
    }

    let categories: Vec<String> = args
        .categories
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if !categories.is_empty() {
        // keep the usual default when the custom set still has it
        let default = categories
            .iter()
            .find(|c| c.eq_ignore_ascii_case("Research"))
            .unwrap_or(&categories[0])
            .clone();
        builder = builder.categories(categories).default_category(default);
    }

    builder.build().context("Invalid configuration")
}

// ── Interactive review ───────────────────────────────────────────────────────

fn ask(label: &str) -> Result<String> {
    eprint!("{} ", bold(label));
    io::stderr().flush().ok();
    let mut line = String::new();
    let n = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    if n == 0 {
        // EOF behaves like quit
        return Ok("q".to_string());
    }
    Ok(line.trim().to_string())
}

fn summary(post: &GeneratedPost) {
    eprintln!();
    eprintln!("{}  {}", cyan("◆"), bold(&post.title));
    eprintln!("   {} {}", dim("category:"), post.category);
    eprintln!("   {} {}", dim("excerpt: "), post.excerpt);
    eprintln!("   {} {}", dim("tags:    "), post.tags.join(", "));
    eprintln!(
        "   {} {} words",
        dim("body:    "),
        post.content.split_whitespace().count()
    );
}

/// Returns `false` when the operator quits without publishing.
async fn review(
    post: &mut GeneratedPost,
    generator: &Generator,
    config: &BlogConfig,
    quiet: bool,
) -> Result<bool> {
    summary(post);
    loop {
        eprintln!();
        eprintln!(
            "{}",
            dim("[c]ontinue  [t]itle  cate[g]ory  [r]efine  [p]review  [q]uit")
        );
        let choice = ask(">")?;
        match choice.to_lowercase().as_str() {
            "" | "c" | "continue" => return Ok(true),
            "q" | "quit" => return Ok(false),
            "t" | "title" => {
                let t = ask("New title:")?;
                if t.is_empty() {
                    eprintln!("{}", yellow("Title unchanged."));
                } else {
                    post.title = t;
                    summary(post);
                }
            }
            "g" | "category" => {
                eprintln!("   {} {}", dim("allowed:"), config.categories.join(", "));
                let c = ask("New category:")?;
                match config.canonical_category(&c) {
                    Some(canon) => {
                        post.category = canon.to_string();
                        summary(post);
                    }
                    None => eprintln!("{} '{}' is not an allowed category", red("✗"), c),
                }
            }
            "r" | "refine" => {
                let feedback = ask("Feedback:")?;
                if feedback.is_empty() {
                    continue;
                }
                let bar = spinner("Refining", "applying feedback…", quiet);
                let res = refine_post(generator, post, &feedback).await;
                bar.finish_and_clear();
                match res {
                    Ok(()) => {
                        eprintln!("{} refined", green("✓"));
                        summary(post);
                    }
                    // A failed refine keeps the current draft.
                    Err(e) => eprintln!("{} {}", red("✗"), e),
                }
            }
            "p" | "preview" => {
                eprintln!();
                for line in post.content.lines().take(60) {
                    eprintln!("  {}", line);
                }
                if post.content.lines().count() > 60 {
                    eprintln!("  {}", dim("…"));
                }
            }
            other => eprintln!("{} unknown choice '{}'", red("✗"), other),
        }
    }
}

// ── check ────────────────────────────────────────────────────────────────────

async fn check(config: &BlogConfig) {
    fn line(ok: bool, what: &str, detail: &str) {
        let mark = if ok { green("✓") } else { yellow("–") };
        println!("{} {:<22} {}", mark, what, dim(detail));
    }

    for var in [
        "ANTHROPIC_API_KEY",
        "OPENAI_API_KEY",
        "GEMINI_API_KEY",
        "EDGEQUAKE_LLM_PROVIDER",
        "EDGEQUAKE_MODEL",
    ] {
        let set = std::env::var(var).is_ok_and(|v| !v.is_empty());
        line(set, var, if set { "set" } else { "not set" });
    }

    match resolve_provider(config).await {
        Ok(_) => line(
            true,
            "LLM provider",
            config.provider_name.as_deref().unwrap_or("auto-detected"),
        ),
        Err(e) => line(false, "LLM provider", &e.to_string().replace('\n', " ")),
    }

    let tesseract = tokio::process::Command::new(&config.tesseract_cmd)
        .arg("--version")
        .output()
        .await;
    match tesseract {
        Ok(out) if out.status.success() => {
            let version = String::from_utf8_lossy(&out.stdout);
            let first = version.lines().next().unwrap_or("").trim().to_string();
            line(true, "tesseract", &first);
        }
        _ => line(
            false,
            "tesseract",
            "not found; image sources are unavailable",
        ),
    }

    let pdfium = tokio::task::spawn_blocking(pdfium_available)
        .await
        .unwrap_or(false);
    line(
        pdfium,
        "libpdfium",
        if pdfium {
            "bound"
        } else {
            "not found; PDFs use the built-in reader"
        },
    );

    println!(
        "{} {:<22} {}",
        cyan("◆"),
        "categories",
        dim(&config.categories.join(", "))
    );
    if config.categories.len() != DEFAULT_CATEGORIES.len()
        || !config
            .categories
            .iter()
            .zip(DEFAULT_CATEGORIES)
            .all(|(a, b)| a == b)
    {
        println!("  {}", dim("(custom set)"));
    }
}

// ── Error reporting ──────────────────────────────────────────────────────────

fn report(err: &anyhow::Error) {
    eprintln!("{} {:#}", red("error:"), err);

    let kind = err
        .chain()
        .find_map(|e| e.downcast_ref::<BlogError>())
        .map(BlogError::kind);
    let hint = match kind {
        Some(ErrorKind::NotFound) => "Check the path, or pass a full http(s):// URL.",
        Some(ErrorKind::Fetch) => "The page could not be downloaded; try --fetch-timeout or save it locally.",
        Some(ErrorKind::Extraction) => "Run `blogpost check` to see which extractors are available.",
        Some(ErrorKind::Validation) => "Adjust the input or the limit named above.",
        Some(ErrorKind::Format) => "Dates are YYYY-MM-DD; front matter is a YAML `key: value` block.",
        Some(ErrorKind::Generation) => "Check the API key and model, or raise --api-timeout.",
        Some(ErrorKind::Other) | None => "",
    };
    if !hint.is_empty() {
        eprintln!("{} {}", dim("hint:"), hint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_date_fails_before_extraction() {
        let err = check_date(Some("15-03-2024")).unwrap_err();
        let kind = err.chain().find_map(|e| e.downcast_ref::<BlogError>()).map(BlogError::kind);
        assert_eq!(kind, Some(ErrorKind::Format));
        assert!(check_date(Some("2024-03-15")).is_ok());
        assert!(check_date(None).is_ok());
    }

    #[test]
    fn log_filter_levels() {
        assert_eq!(log_filter(false, false), "info");
        assert_eq!(log_filter(true, false), "debug");
        assert_eq!(log_filter(false, true), "error");
    }

    #[test]
    fn generate_accepts_date_flag() {
        let cli = Cli::try_parse_from(["blogpost", "generate", "notes.txt", "--date", "2024-03-15"])
            .unwrap();
        match cli.command {
            Command::Generate { date, .. } => assert_eq!(date.as_deref(), Some("2024-03-15")),
            _ => panic!("expected generate"),
        }
    }
}
