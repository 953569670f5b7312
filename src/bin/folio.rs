//! CLI binary for resume-folio.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PortfolioConfig`, drives a `Session` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use resume_folio::{
    extract_text, theme, PipelineProgressCallback, PortfolioConfig, PortfolioOutput,
    ProgressCallback, Session, Stage, Theme,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one spinner per run plus a log line per
/// finished stage. A fresh spinner is created on every `on_run_start` so
/// interactive regeneration gets its own.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(ref bar) = *guard {
                f(bar);
            }
        }
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_run_start(&self, reused_resume: bool) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        if reused_resume {
            bar.println(format!(
                "{} {}",
                cyan("◆"),
                bold("Regenerating theme and layout (resume data reused)…")
            ));
        } else {
            bar.println(format!("{} {}", cyan("◆"), bold("Building your portfolio…")));
        }
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(bar);
        }
    }

    fn on_stage_start(&self, stage: Stage) {
        self.with_bar(|bar| {
            bar.set_prefix(capitalise(&stage.to_string()));
            bar.set_message(match stage {
                Stage::Extracting => "reading the PDF…",
                Stage::Structuring => "asking the model to structure your resume…",
                Stage::SelectingTheme => "choosing a theme…",
                Stage::GeneratingLayout => "designing the page (this is the slow one)…",
                Stage::Rendering => "filling in your details…",
            });
        });
    }

    fn on_stage_complete(&self, stage: Stage, duration_ms: u64) {
        self.with_bar(|bar| {
            bar.println(format!(
                "  {} {:<18} {}",
                green("✓"),
                stage.to_string(),
                dim(&format!("{:.1}s", duration_ms as f64 / 1000.0)),
            ));
        });
    }

    fn on_retry(&self, stage: Stage, attempt: u32, reason: &str) {
        let reason = truncate(reason, 80);
        self.with_bar(|bar| {
            bar.println(format!(
                "  {} {:<18} attempt {}  {}",
                yellow("↻"),
                stage.to_string(),
                attempt,
                dim(&reason),
            ));
        });
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        let error = truncate(error, 80);
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(bar) = guard.take() {
                bar.println(format!("  {} {:<18} {}", red("✗"), stage.to_string(), red(&error)));
                bar.finish_and_clear();
            }
        }
    }

    fn on_run_complete(&self, html_len: usize) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(bar) = guard.take() {
                bar.finish_and_clear();
            }
        }
        eprintln!(
            "{} portfolio rendered {}",
            green("✔"),
            dim(&format!("({html_len} bytes)"))
        );
    }
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    let first_line = s.lines().next().unwrap_or_default();
    if first_line.chars().count() > max {
        let cut: String = first_line.chars().take(max - 1).collect();
        format!("{cut}\u{2026}")
    } else {
        first_line.to_string()
    }
}

const PRIVACY_BANNER: &str = "\
Your resume text and the structured data extracted from it are sent to the
configured model provider. Do not upload a resume you are not allowed to share.";

const AFTER_HELP: &str = r#"EXAMPLES:
  # Generate a portfolio in the current directory (index.html)
  folio resume.pdf

  # Keep artifacts in a separate directory and copy the page elsewhere
  folio resume.pdf --work-dir site -o ~/public/me.html

  # Pick the theme yourself; regenerate until you like it
  folio resume.pdf --theme dark_theme --interactive

  # Cheap model for structuring, strong model for the layout
  folio resume.pdf --structure-model gpt-4.1-nano --layout-model gpt-4.1

  # Resume from a URL, or plain text that was extracted elsewhere
  folio https://example.org/cv.pdf
  folio resume.txt

  # Just show the text the model would see (no API key needed)
  folio --extract-only resume.pdf

  # Machine-readable result
  folio --json resume.pdf > result.json

THEMES:
  modern, minimalist, dark_theme, creative, corporate, elegant,
  tech (fallback), artistic, classic, grid_based, vibrant

ARTIFACTS (inside --work-dir):
  parser.json                         structured resume data
  templates/generated_template.html   generated layout template
  index.html                          the rendered portfolio

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, e.g. resume_folio=debug

  A .env file in the current directory is loaded at startup.
"#;

/// Turn a resume PDF into a generated portfolio web page.
#[derive(Parser, Debug)]
#[command(
    name = "folio",
    version,
    about = "Turn a resume PDF into a generated portfolio web page",
    long_about = "Extract the text of a resume PDF, structure it with an LLM, pick a visual \
theme, have the model write an HTML layout, and render the final page. Supports OpenAI, \
Anthropic, Google Gemini, Ollama and any OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Resume PDF path, HTTP/HTTPS URL, or a .txt file of resume text.
    input: String,

    /// Also write the rendered page to this file.
    #[arg(short, long, env = "FOLIO_OUTPUT")]
    output: Option<PathBuf>,

    /// Directory for parser.json, templates/ and index.html.
    #[arg(long, env = "FOLIO_WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "FOLIO_PROVIDER")]
    provider: Option<String>,

    /// Default model for every stage.
    #[arg(long, env = "FOLIO_MODEL")]
    model: Option<String>,

    /// Model for structuring the resume.
    #[arg(long, env = "FOLIO_STRUCTURE_MODEL")]
    structure_model: Option<String>,

    /// Model for choosing the theme.
    #[arg(long, env = "FOLIO_THEME_MODEL")]
    theme_model: Option<String>,

    /// Model for writing the layout.
    #[arg(long, env = "FOLIO_LAYOUT_MODEL")]
    layout_model: Option<String>,

    /// Use this theme instead of asking the model.
    #[arg(long, env = "FOLIO_THEME", value_parser = parse_theme)]
    theme: Option<Theme>,

    /// PDF user password for encrypted resumes.
    #[arg(long, env = "FOLIO_PASSWORD")]
    password: Option<String>,

    /// Retries per model call on transient API failures (0-10).
    #[arg(long, env = "FOLIO_MAX_RETRIES", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(0..=10))]
    max_retries: u32,

    /// Times a stage may re-ask the model after an unusable reply.
    #[arg(long, env = "FOLIO_MAX_ATTEMPTS", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// Per-call model timeout in seconds.
    #[arg(long, env = "FOLIO_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "FOLIO_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Render placeholders for missing fields as empty instead of regenerating.
    #[arg(long, env = "FOLIO_LENIENT")]
    lenient: bool,

    /// Print the full result (resume, theme, stats, paths) as JSON.
    #[arg(long, env = "FOLIO_JSON")]
    json: bool,

    /// Print the extracted text only; no model is called.
    #[arg(long)]
    extract_only: bool,

    /// After each result, offer to regenerate theme and layout.
    #[arg(short, long, env = "FOLIO_INTERACTIVE")]
    interactive: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "FOLIO_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FOLIO_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FOLIO_QUIET")]
    quiet: bool,
}

fn parse_theme(s: &str) -> Result<Theme, theme::UnknownTheme> {
    s.trim().to_lowercase().replace([' ', '-'], "_").parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // per-stage lines carry the same information.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.extract_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let config = build_config(&cli, None)?;
        let text = if is_text_file(&cli.input) {
            read_text_upload(&cli.input).await?
        } else {
            extract_text(&cli.input, &config)
                .await
                .context("Failed to extract text")?
        };
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        if !text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
        return Ok(());
    }

    if !cli.quiet {
        eprintln!("{} {}", yellow("⚠"), dim(PRIVACY_BANNER));
    }

    // ── Build session ────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let mut session = Session::from_config(config).context("Failed to configure model provider")?;

    if is_text_file(&cli.input) {
        session.upload_text(read_text_upload(&cli.input).await?);
    } else {
        session.upload(cli.input.as_str());
    }

    // ── Generate (and regenerate while the user asks) ────────────────────
    loop {
        let output = session.generate().await.context("Portfolio generation failed")?;

        if let Some(ref path) = cli.output {
            resume_folio::store::write_atomic(path, output.html.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        report(&cli, &output)?;

        if !cli.interactive || !ask_regenerate().await? {
            break;
        }
    }

    Ok(())
}

/// Print the result of one run.
fn report(cli: &Cli, output: &PortfolioOutput) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    println!("{}", output.artifacts.portfolio.display());

    if !cli.quiet {
        let theme_note = if output.theme.fell_back {
            yellow(" (model reply not in catalog; fallback)")
        } else if output.theme.raw_reply.is_none() {
            dim(" (forced)")
        } else {
            String::new()
        };
        eprintln!(
            "{}  theme {}{}  {}ms  →  {}",
            green("✔"),
            bold(output.theme.theme.label()),
            theme_note,
            output.stats.total_duration_ms,
            bold(&output.artifacts.portfolio.display().to_string()),
        );
        if let Some(ref path) = cli.output {
            eprintln!("   copied to {}", bold(&path.display().to_string()));
        }
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&output.stats.total_input_tokens.to_string()),
            dim(&output.stats.total_output_tokens.to_string()),
        );
    }
    Ok(())
}

/// Ask on stderr whether to generate again; reads one line from stdin.
async fn ask_regenerate() -> Result<bool> {
    eprint!("{} ", bold("Not satisfied? Generate again? [y/N]"));
    io::stderr().flush().ok();
    let answer = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).map(|_| line)
    })
    .await
    .context("Prompt task panicked")?
    .context("Failed to read answer")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn is_text_file(input: &str) -> bool {
    !input.starts_with("http://")
        && !input.starts_with("https://")
        && Path::new(input)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}

async fn read_text_upload(input: &str) -> Result<String> {
    tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read resume text from {input}"))
}

/// Map CLI args to `PortfolioConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PortfolioConfig> {
    let mut builder = PortfolioConfig::builder()
        .work_dir(cli.work_dir.clone())
        .max_retries(cli.max_retries)
        .max_attempts(cli.max_attempts)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .strict_undefined(!cli.lenient);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = cli.structure_model {
        builder = builder.structure_model(model);
    }
    if let Some(ref model) = cli.theme_model {
        builder = builder.theme_model(model);
    }
    if let Some(ref model) = cli.layout_model {
        builder = builder.layout_model(model);
    }
    if let Some(theme) = cli.theme {
        builder = builder.theme(theme);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
