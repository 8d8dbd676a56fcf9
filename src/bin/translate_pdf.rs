//! CLI binary for pdf-translate-html.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `TranslationConfig`, shows progress, and turns the outcome into an exit
//! code: 0 on success, 3 when some pages failed, 1 on fatal errors.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use pdf_translate_html::{
    translate_to_file, BackendKind, PageSelection, ProgressCallback, TranslationConfig,
    TranslationOutput, TranslationProgressCallback,
};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Exit code when the document was written but some pages are error markers.
const EXIT_PARTIAL: u8 = 3;

/// Warnings listed individually in the end-of-run summary.
const MAX_LISTED_WARNINGS: usize = 10;

// ── Terminal styling ─────────────────────────────────────────────────────────

/// Colour is off when stderr is not a terminal or `NO_COLOR` is set.
static COLOUR: Lazy<bool> =
    Lazy::new(|| io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none());

#[derive(Clone, Copy)]
enum Style {
    Good,
    Bad,
    Warn,
    Faint,
}

impl Style {
    fn paint(self, text: impl fmt::Display) -> String {
        if !*COLOUR {
            return text.to_string();
        }
        let sgr = match self {
            Style::Good => "1;32",
            Style::Bad => "1;31",
            Style::Warn => "1;33",
            Style::Faint => "2",
        };
        format!("\x1b[{sgr}m{text}\x1b[0m")
    }
}

/// One status line with a right-aligned verb: `  Translated page 3/12`.
fn status(style: Style, verb: &str, rest: impl fmt::Display) -> String {
    format!("{} {rest}", style.paint(format!("{verb:>12}")))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

// ── Progress reporting ───────────────────────────────────────────────────────

/// A bar pinned to the bottom of the terminal with a status line above it
/// for every finished page. Workers finish out of order, so start instants
/// are keyed by page number.
struct PageProgress {
    bar: ProgressBar,
    started: Mutex<HashMap<usize, Instant>>,
}

impl PageProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{prefix:>12.cyan.bold} [{bar:30}] {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_prefix("Decoding");
        bar.enable_steady_tick(Duration::from_millis(120));
        Arc::new(Self {
            bar,
            started: Mutex::new(HashMap::new()),
        })
    }

    fn took(&self, page_num: usize) -> f64 {
        self.started
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&page_num)
            .map_or(0.0, |t| t.elapsed().as_secs_f64())
    }
}

impl TranslationProgressCallback for PageProgress {
    fn on_translation_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
        self.bar.set_prefix("Translating");
        self.bar.reset_eta();
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.started
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(page_num, Instant::now());
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, html_len: usize) {
        let detail = format!("({:.1} KiB, {:.1}s)", html_len as f64 / 1024.0, self.took(page_num));
        self.bar.println(status(
            Style::Good,
            "Translated",
            format!("page {page_num}/{total} {}", Style::Faint.paint(detail)),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let took = format!("({:.1}s)", self.took(page_num));
        self.bar.println(status(
            Style::Bad,
            "Failed",
            format!("page {page_num}/{total}: {} {}", truncate(error, 80), Style::Faint.paint(took)),
        ));
        self.bar.inc(1);
    }

    fn on_translation_complete(&self, _total_pages: usize, _success_count: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # English to Italian (defaults) with the Google backend
  translate_pdf paper.pdf paper.it.html

  # German to French
  translate_pdf -s de -t fr bericht.pdf rapport.html

  # Offline, through a local Ollama model
  translate_pdf --translator local --local-model llama3.2 paper.pdf out.html

  # First ten pages, with a JSON run report
  translate_pdf --pages 1-10 --report run.json book.pdf book.html

EXIT CODES:
  0  every page rendered (some text may have kept its original wording)
  3  document written, but at least one page is an error marker
  1  nothing written: bad input or output, backend unavailable,
     or every page failed

ENVIRONMENT VARIABLES:
  TRANSLATE_PDF_*   Every flag can also be set through the environment
  PDFIUM_LIB_PATH   Directory containing the pdfium shared library
  RUST_LOG          Overrides the log filter (e.g. pdf_translate_html=debug)
"#;

/// Translate a PDF into a self-contained HTML file.
#[derive(Parser, Debug)]
#[command(
    name = "translate_pdf",
    version,
    about = "Translate a PDF into a self-contained HTML file",
    long_about = "Translate the text of a PDF from one language to another and write the result \
as a single HTML file. Images are embedded inline, and internal and external links are kept.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to translate.
    input_pdf: PathBuf,

    /// Where to write the HTML document.
    output_html: PathBuf,

    /// Source language code.
    #[arg(short, long = "source", env = "TRANSLATE_PDF_SOURCE", default_value = "en")]
    source: String,

    /// Target language code.
    #[arg(short, long = "target", env = "TRANSLATE_PDF_TARGET", default_value = "it")]
    target: String,

    /// Translation service.
    #[arg(long, env = "TRANSLATE_PDF_TRANSLATOR", value_enum, default_value = "google")]
    translator: TranslatorArg,

    /// Pages translated at the same time. Default: number of CPUs.
    #[arg(short, long, env = "TRANSLATE_PDF_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "TRANSLATE_PDF_PAGES", default_value = "all")]
    pages: String,

    /// Retries per text block on transient backend failures.
    #[arg(long, env = "TRANSLATE_PDF_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Base delay before the first retry; doubles on each further retry.
    #[arg(long, env = "TRANSLATE_PDF_RETRY_BACKOFF_MS", default_value_t = 500)]
    retry_backoff_ms: u64,

    /// Per-request timeout for the Google backend, in seconds.
    #[arg(long, env = "TRANSLATE_PDF_API_TIMEOUT", default_value_t = 30)]
    api_timeout: u64,

    /// Model used by the local backend.
    #[arg(long, env = "TRANSLATE_PDF_LOCAL_MODEL")]
    local_model: Option<String>,

    /// edgequake-llm provider used by the local backend.
    #[arg(long, env = "TRANSLATE_PDF_LOCAL_PROVIDER", default_value = "ollama")]
    local_provider: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "TRANSLATE_PDF_PASSWORD")]
    password: Option<String>,

    /// Leave images out of the HTML.
    #[arg(long, env = "TRANSLATE_PDF_NO_IMAGES")]
    no_images: bool,

    /// Omit the `--- Page n ---` footer after each page.
    #[arg(long, env = "TRANSLATE_PDF_NO_PAGE_FOOTER")]
    no_page_footer: bool,

    /// Write a JSON report (stats, per-page results, warnings) to this file.
    #[arg(long, env = "TRANSLATE_PDF_REPORT")]
    report: Option<PathBuf>,

    /// Disable the progress bar.
    #[arg(long, env = "TRANSLATE_PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TRANSLATE_PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "TRANSLATE_PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum TranslatorArg {
    Google,
    Local,
}

impl From<TranslatorArg> for BackendKind {
    fn from(v: TranslatorArg) -> Self {
        match v {
            TranslatorArg::Google => BackendKind::Google,
            TranslatorArg::Local => BackendKind::Local,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };
    let quiet = cli.quiet;

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            if !quiet {
                eprintln!("{} {:#}", Style::Bad.paint("error:"), e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(PageProgress::new() as Arc<dyn TranslationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run translation ──────────────────────────────────────────────────
    let output = translate_to_file(&cli.input_pdf, &cli.output_html, &config)
        .await
        .context("Translation failed")?;

    if let Some(ref report) = cli.report {
        write_report(report, &cli, &output)?;
    }

    if !cli.quiet {
        print_summary(&cli, &output);
    }

    Ok(if output.is_partial() {
        ExitCode::from(EXIT_PARTIAL)
    } else {
        ExitCode::SUCCESS
    })
}

/// Map CLI args to `TranslationConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TranslationConfig> {
    let pages: PageSelection = cli.pages.parse().context("Invalid --pages value")?;

    let mut builder = TranslationConfig::builder()
        .source_lang(&cli.source)
        .target_lang(&cli.target)
        .backend(cli.translator.into())
        .local_provider(&cli.local_provider)
        .pages(pages)
        .max_retries(cli.max_retries)
        .retry_backoff_ms(cli.retry_backoff_ms)
        .api_timeout_secs(cli.api_timeout)
        .include_images(!cli.no_images)
        .page_footer(!cli.no_page_footer);

    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(ref model) = cli.local_model {
        builder = builder.local_model(model);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn write_report(path: &Path, cli: &Cli, output: &TranslationOutput) -> Result<()> {
    let report = serde_json::json!({
        "input": cli.input_pdf,
        "output": cli.output_html,
        "source_lang": cli.source,
        "target_lang": cli.target,
        "translator": BackendKind::from(cli.translator),
        "metadata": output.metadata,
        "stats": output.stats,
        "pages": output.pages,
    });
    let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))
}

fn print_summary(cli: &Cli, output: &TranslationOutput) {
    let stats = &output.stats;
    let selected = stats.processed_pages + stats.failed_pages;
    let (style, verb) = if stats.failed_pages == 0 {
        (Style::Good, "Finished")
    } else {
        (Style::Warn, "Partial")
    };

    eprintln!(
        "{}",
        status(
            style,
            verb,
            format!(
                "{}/{} pages in {:.1}s -> {}",
                stats.processed_pages,
                selected,
                stats.total_duration_ms as f64 / 1000.0,
                cli.output_html.display()
            )
        )
    );
    eprintln!(
        "{}",
        status(
            Style::Faint,
            "Backend",
            format!(
                "{} calls, {} cache hits, {} kept original",
                stats.backend_calls, stats.cache_hits, stats.fallbacks
            )
        )
    );

    if stats.warnings > 0 {
        eprintln!("{}", status(Style::Warn, "Warnings", stats.warnings));
        for w in output.warnings().take(MAX_LISTED_WARNINGS) {
            eprintln!("{:>12} {}", "", Style::Faint.paint(w));
        }
        if stats.warnings > MAX_LISTED_WARNINGS {
            let more = format!("and {} more", stats.warnings - MAX_LISTED_WARNINGS);
            eprintln!("{:>12} {}", "", Style::Faint.paint(more));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["translate_pdf"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn positional_args_and_defaults() {
        let cli = parse(&["in.pdf", "out.html"]);
        assert_eq!(cli.input_pdf, PathBuf::from("in.pdf"));
        assert_eq!(cli.output_html, PathBuf::from("out.html"));
        assert_eq!(cli.source, "en");
        assert_eq!(cli.target, "it");
        assert_eq!(cli.translator, TranslatorArg::Google);
        assert_eq!(cli.pages, "all");
    }

    #[test]
    fn short_language_flags() {
        let cli = parse(&["-s", "de", "-t", "fr", "a.pdf", "b.html"]);
        assert_eq!(cli.source, "de");
        assert_eq!(cli.target, "fr");
    }

    #[test]
    fn local_translator() {
        let cli = parse(&["--translator", "local", "--local-model", "qwen2.5", "a.pdf", "b.html"]);
        assert_eq!(BackendKind::from(cli.translator), BackendKind::Local);
        assert_eq!(cli.local_model.as_deref(), Some("qwen2.5"));
    }

    #[test]
    fn unknown_translator_is_rejected() {
        let err = Cli::try_parse_from(["translate_pdf", "--translator", "deepl", "a.pdf", "b.html"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn missing_output_is_rejected() {
        assert!(Cli::try_parse_from(["translate_pdf", "a.pdf"]).is_err());
    }

    #[test]
    fn config_from_flags() {
        let cli = parse(&[
            "--pages",
            "2-4",
            "--no-images",
            "--no-page-footer",
            "--max-retries",
            "5",
            "a.pdf",
            "b.html",
        ]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.pages, PageSelection::Range(2, 4));
        assert!(!config.include_images);
        assert!(!config.page_footer);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.backend, BackendKind::Google);
    }

    #[test]
    fn long_errors_are_shortened() {
        assert_eq!(truncate("short", 80), "short");
        let cut = truncate(&"x".repeat(100), 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn bad_page_selection_fails_config() {
        let cli = parse(&["--pages", "9-2", "a.pdf", "b.html"]);
        assert!(build_config(&cli, None).is_err());
    }
}
