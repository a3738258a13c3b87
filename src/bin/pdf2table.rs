//! CLI binary for edgequake-pdf2table.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig` and prints stage reports.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edgequake_pdf2table::{
    extract_stage, render_stage, run_pipeline, structure_stage, PipelineConfig,
    PipelineProgressCallback, ProgressCallback, Stage, StageReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

/// Terminal progress callback: one progress bar, restyled at the start of
/// each stage, plus a log line per item.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn unit(stage: Stage) -> &'static str {
        match stage {
            Stage::Render => "pages",
            Stage::Extract => "images",
            Stage::Structure => "responses",
        }
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage, total: usize) {
        let template = format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  \
             [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {}  \
             ⏱ {{elapsed_precise}}  ETA {{eta_precise}}",
            Self::unit(stage)
        );
        let style = ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(style);
        self.bar.set_prefix(format!("{stage:<9}"));
        self.bar.reset_eta();
        self.bar.reset_elapsed();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{stage}: {total} {}", Self::unit(stage)))
        ));
    }

    fn on_item_complete(&self, _stage: Stage, index: usize, total: usize, output: &Path) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total,
            dim(&output.display().to_string()),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, _stage: Stage, index: usize, total: usize, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_stage_complete(&self, stage: Stage, total: usize, succeeded: usize) {
        let failed = total.saturating_sub(succeeded);
        let unit = Self::unit(stage);
        if failed == 0 {
            self.bar.println(format!(
                "{} {stage}: {} {unit} processed",
                green("✔"),
                bold(&succeeded.to_string())
            ));
        } else {
            self.bar.println(format!(
                "{} {stage}: {}/{} {unit} processed  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
            ));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Full pipeline: PDF → page images → model responses → CSV
  pdf2table run statement.pdf

  # From a URL, lower resolution, different model
  pdf2table --dpi 300 --model gpt-4.1-mini run https://example.com/report.pdf

  # Re-run a single stage after fixing a failure
  pdf2table extract
  pdf2table structure

  # Machine-readable report
  pdf2table --json run statement.pdf > report.json

OUTPUT LAYOUT:
  extracted_images/page_{n}.png         one image per page
  extracted_txt_files/response{n}.txt   raw model response per image
  extracted_csv_files/response{n}.csv   one CSV per parsable response

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  RUST_LOG                Log filter (overrides -v / -q)
"#;

/// Extract tables from PDF files into CSV using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2table",
    version,
    about = "Extract tables from PDF files into CSV using Vision LLMs",
    long_about = "Render each page of a PDF (local file or URL) to an image, ask a Vision \
Language Model to read its tables as JSON, and write one CSV file per page. Supports OpenAI, \
Anthropic, Google Gemini, Azure OpenAI, and any OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory for rendered page images.
    #[arg(long, global = true, env = "PDF2TABLE_IMAGE_DIR", default_value = "extracted_images")]
    image_dir: PathBuf,

    /// Directory for raw model responses.
    #[arg(long, global = true, env = "PDF2TABLE_TEXT_DIR", default_value = "extracted_txt_files")]
    text_dir: PathBuf,

    /// Directory for CSV output.
    #[arg(long, global = true, env = "PDF2TABLE_TABLE_DIR", default_value = "extracted_csv_files")]
    table_dir: PathBuf,

    /// Rendering DPI (72–1200).
    #[arg(long, global = true, env = "PDF2TABLE_DPI", default_value_t = 500,
          value_parser = clap::value_parser!(u32).range(72..=1200))]
    dpi: u32,

    /// LLM model ID (e.g. gpt-4o, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, global = true, env = "PDF2TABLE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        global = true,
        env = "PDF2TABLE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Max LLM output tokens per image.
    #[arg(long, global = true, env = "PDF2TABLE_MAX_TOKENS", default_value_t = 2000)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0). Provider default when unset.
    #[arg(long, global = true, env = "PDF2TABLE_TEMPERATURE")]
    temperature: Option<f32>,

    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "PDF2TABLE_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, global = true, env = "PDF2TABLE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Path to the pdfium shared library.
    #[arg(long, global = true, env = "PDF2TABLE_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "PDF2TABLE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the stage report as JSON on stdout.
    #[arg(long, global = true, env = "PDF2TABLE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDF2TABLE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2TABLE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2TABLE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render, extract, and structure in one go.
    Run {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,
    },
    /// Render PDF pages into the image directory.
    Render {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,
    },
    /// Send every image in the image directory to the model.
    Extract,
    /// Convert every response in the text directory to CSV.
    Structure,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    let cli_progress = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn PipelineProgressCallback>);

    let config = build_config(&cli, progress_cb).await?;
    let result = execute(&cli, &config).await;

    if let Some(cb) = cli_progress {
        cb.bar.finish_and_clear();
    }
    result
}

async fn execute(cli: &Cli, config: &PipelineConfig) -> Result<()> {
    match cli.command {
        Command::Run { .. } => {
            let report = run_pipeline(config).await.context("Pipeline failed")?;
            if cli.json {
                print_json(&report)?;
            }
            if !cli.quiet {
                let failed = report.extraction.failed() + report.structuring.failed();
                eprintln!(
                    "{}  {} pages  →  {} responses  →  {} CSV files  {}ms  →  {}",
                    if failed == 0 { green("✔") } else { cyan("⚠") },
                    report.pages.len(),
                    report.extraction.succeeded(),
                    report.structuring.succeeded(),
                    report.total_duration_ms,
                    bold(&config.table_dir.display().to_string()),
                );
                eprintln!(
                    "   {} tokens in  /  {} tokens out",
                    dim(&report.extraction.total_input_tokens().to_string()),
                    dim(&report.extraction.total_output_tokens().to_string()),
                );
            }
        }
        Command::Render { .. } => {
            let pages = render_stage(config).await.context("Rendering failed")?;
            if cli.json {
                print_json(&pages)?;
            }
            if !cli.quiet {
                eprintln!(
                    "{}  {} pages  →  {}",
                    green("✔"),
                    pages.len(),
                    bold(&config.image_dir.display().to_string()),
                );
            }
        }
        Command::Extract => {
            let report = extract_stage(config).await.context("Extraction failed")?;
            if cli.json {
                print_json(&report)?;
            }
            if !cli.quiet {
                print_summary(&report, &config.text_dir);
                eprintln!(
                    "   {} tokens in  /  {} tokens out",
                    dim(&report.total_input_tokens().to_string()),
                    dim(&report.total_output_tokens().to_string()),
                );
            }
        }
        Command::Structure => {
            let report = structure_stage(config).context("Structuring failed")?;
            if cli.json {
                print_json(&report)?;
            }
            if !cli.quiet {
                print_summary(&report, &config.table_dir);
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise report")?;
    println!("{json}");
    Ok(())
}

fn print_summary<T>(report: &StageReport<T>, dir: &Path) {
    eprintln!(
        "{}  {}/{} {}  {}ms  →  {}",
        if report.failed() == 0 { green("✔") } else { cyan("⚠") },
        report.succeeded(),
        report.total(),
        report.stage,
        report.duration_ms,
        bold(&dir.display().to_string()),
    );
    for err in report.errors() {
        eprintln!("   {} {}", red("✗"), err);
    }
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .image_dir(&cli.image_dir)
        .text_dir(&cli.text_dir)
        .table_dir(&cli.table_dir)
        .dpi(cli.dpi)
        .max_tokens(cli.max_tokens)
        .download_timeout_secs(cli.download_timeout);

    match &cli.command {
        Command::Run { input } | Command::Render { input } => {
            builder = builder.input(input.as_str());
        }
        Command::Extract | Command::Structure => {}
    }

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.as_str());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.as_str());
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.as_str());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
