//! CLI binary for edgequake-tables.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `IndexConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_tables::pipeline::input::load_document;
use edgequake_tables::{
    build_index, page_debug_svg, page_markup, search_text, Collaborators, IndexConfig,
    IndexProgressCallback, ProgressCallback, SearchResult,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per page.
/// Pages complete out of order, so start times are tracked per page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// The bar starts as a spinner; `on_index_start` gives it a length.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Splitting PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Indexing");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        let elapsed_ms = self
            .start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&page_num))
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        elapsed_ms as f64 / 1000.0
    }
}

impl IndexProgressCallback for CliProgressCallback {
    fn on_index_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Looking for tables on {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, tables: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{tables:>2} tables")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_index_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages indexed successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages indexed  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rank tables against a reference embedding stored as a JSON array
  pdf2tables search report.pdf --reference reference.json

  # Rank tables against a text query (embedded with the same model)
  pdf2tables search report.pdf --query "quarterly revenue by region" --top 3

  # Machine-readable results
  pdf2tables search https://example.com/report.pdf --query "headcount" --json

  # Reconciled page markup, one section per page
  pdf2tables markup report.pdf --pages

  # Geometry overlay for page 4
  pdf2tables svg report.pdf --page 4 -o page4.svg

ENVIRONMENT VARIABLES:
  EXTRACT_TABLES_ENDPOINT  Table-detection service URL
  EXTRACT_TABLES_KEY       Table-detection API key (x-api-key)
  EMBEDDING_ENDPOINT       OpenAI-compatible /embeddings URL
  EMBEDDING_MODEL          Embedding model (default text-embedding-3-small)
  EMBEDDING_API_KEY        Bearer token for the embedding endpoint
  OPENAI_API_KEY           OpenAI API key (table descriptions)
  ANTHROPIC_API_KEY        Anthropic API key (table descriptions)
  EDGEQUAKE_LLM_PROVIDER   Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL          Override model ID
  PDFIUM_LIB_PATH          Path to libpdfium used for layout analysis
"#;

/// Find tables in PDF files and rank them by embedding distance.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2tables",
    version,
    about = "Find tables in PDF files and rank them by embedding distance",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    services: ServiceArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2TABLES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2TABLES_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index every table in the document and rank it against a reference.
    Search {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Reference embedding: a JSON array, inline or in a file.
        #[arg(long, conflicts_with = "query", required_unless_present = "query")]
        reference: Option<String>,

        /// Text to embed and use as the reference.
        #[arg(long)]
        query: Option<String>,

        /// Only print the N nearest tables.
        #[arg(long)]
        top: Option<usize>,

        /// Output structured JSON instead of text.
        #[arg(long, env = "PDF2TABLES_JSON")]
        json: bool,

        /// Disable progress bar.
        #[arg(long, env = "PDF2TABLES_NO_PROGRESS")]
        no_progress: bool,
    },

    /// Print the reconciled markup of every page.
    Markup {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Precede each page with a `<!-- page N -->` marker.
        #[arg(long)]
        pages: bool,

        /// Output structured JSON instead of markup.
        #[arg(long, env = "PDF2TABLES_JSON")]
        json: bool,
    },

    /// Draw one page's text blocks and tables as SVG.
    Svg {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// 1-based page number.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        page: u64,

        /// Write SVG to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ServiceArgs {
    /// Table-detection service URL.
    #[arg(long, global = true, env = "EXTRACT_TABLES_ENDPOINT")]
    tables_endpoint: Option<String>,

    /// Table-detection API key.
    #[arg(long, global = true, env = "EXTRACT_TABLES_KEY", hide_env_values = true)]
    tables_key: Option<String>,

    /// OpenAI-compatible embeddings URL.
    #[arg(long, global = true, env = "EMBEDDING_ENDPOINT")]
    embedding_endpoint: Option<String>,

    /// Embedding model name.
    #[arg(
        long,
        global = true,
        env = "EMBEDDING_MODEL",
        default_value = "text-embedding-3-small"
    )]
    embedding_model: String,

    /// Embedding API key.
    #[arg(long, global = true, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_key: Option<String>,

    /// LLM model ID used to describe tables.
    #[arg(long, global = true, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, global = true, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "PDF2TABLES_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Max LLM output tokens per page.
    #[arg(long, global = true, env = "PDF2TABLES_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Path to a text file containing a custom describer prompt.
    #[arg(long, global = true, env = "PDF2TABLES_DESCRIBER_PROMPT")]
    describer_prompt: Option<PathBuf>,

    /// Per-request timeout for the detector and embedder, in seconds.
    #[arg(long, global = true, env = "PDF2TABLES_REQUEST_TIMEOUT", default_value_t = 60)]
    request_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "PDF2TABLES_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level logs while it is shown.
    let show_progress = match &cli.command {
        Command::Search {
            json, no_progress, ..
        } => !cli.quiet && !*no_progress && !*json,
        _ => false,
    };
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn IndexProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli.services, progress_cb).await?;

    match cli.command {
        Command::Search {
            input,
            reference,
            query,
            top,
            json,
            ..
        } => {
            let reference = match reference {
                Some(ref raw) => Some(parse_reference(raw).await?),
                None => None,
            };

            let document = load_document(&input, config.download_timeout_secs)
                .await
                .with_context(|| format!("Failed to load {input}"))?;
            let collaborators = Collaborators::from_config(&config)
                .await
                .context("Failed to set up collaborators")?;
            let index = build_index(document, &collaborators, &config)
                .await
                .context("Indexing failed")?;

            let mut results = match (reference, query) {
                (Some(reference), _) => index.search(&reference).context("Search failed")?,
                (None, Some(query)) => {
                    search_text(&index, &query, collaborators.embedder.as_ref())
                        .await
                        .context("Search failed")?
                }
                (None, None) => anyhow::bail!("either --reference or --query is required"),
            };
            if let Some(n) = top {
                results.truncate(n);
            }

            if json {
                let json =
                    serde_json::to_string_pretty(&results).context("Failed to serialise results")?;
                println!("{json}");
            } else {
                print_results(&results)?;
            }

            if !cli.quiet && !show_progress {
                eprintln!(
                    "Indexed {} tables from {}/{} pages in {}ms",
                    index.stats.tables_indexed,
                    index.stats.succeeded_pages,
                    index.stats.total_pages,
                    index.stats.total_duration_ms
                );
                if index.stats.failed_pages > 0 {
                    eprintln!("  {} pages failed", index.stats.failed_pages);
                }
            }
        }

        Command::Markup { input, pages, json } => {
            let document = load_document(&input, config.download_timeout_secs)
                .await
                .with_context(|| format!("Failed to load {input}"))?;
            let collaborators = Collaborators::from_config(&config)
                .await
                .context("Failed to set up collaborators")?;
            let results = page_markup(document, &collaborators)
                .await
                .context("Markup failed")?;

            if json {
                let json =
                    serde_json::to_string_pretty(&results).context("Failed to serialise markup")?;
                println!("{json}");
            } else {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                for page in &results {
                    if let Some(ref e) = page.error {
                        if !cli.quiet {
                            eprintln!("  {} {}", red("✗"), e);
                        }
                        continue;
                    }
                    if pages {
                        writeln!(handle, "<!-- page {} -->", page.page_num)
                            .context("Failed to write to stdout")?;
                    }
                    writeln!(handle, "{}", page.markup).context("Failed to write to stdout")?;
                }
            }
        }

        Command::Svg {
            input,
            page,
            output,
        } => {
            let document = load_document(&input, config.download_timeout_secs)
                .await
                .with_context(|| format!("Failed to load {input}"))?;
            let collaborators = Collaborators::from_config(&config)
                .await
                .context("Failed to set up collaborators")?;
            let svg = page_debug_svg(document, page as usize, &collaborators)
                .await
                .context("Failed to draw page")?;

            match output {
                Some(path) => {
                    tokio::fs::write(&path, svg)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    if !cli.quiet {
                        eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
                    }
                }
                None => println!("{svg}"),
            }
        }
    }

    Ok(())
}

/// Map CLI args to `IndexConfig`.
async fn build_config(args: &ServiceArgs, progress: Option<ProgressCallback>) -> Result<IndexConfig> {
    let mut builder = IndexConfig::builder()
        .embedding_model(&args.embedding_model)
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .request_timeout_secs(args.request_timeout)
        .download_timeout_secs(args.download_timeout);

    if let Some(ref url) = args.tables_endpoint {
        builder = builder.table_detector_endpoint(url);
    }
    if let Some(ref key) = args.tables_key {
        builder = builder.table_detector_api_key(key);
    }
    if let Some(ref url) = args.embedding_endpoint {
        builder = builder.embedding_endpoint(url);
    }
    if let Some(ref key) = args.embedding_key {
        builder = builder.embedding_api_key(key);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref path) = args.describer_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read describer prompt from {:?}", path))?;
        builder = builder.describer_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `--reference` is either an inline JSON array or a path to a file holding one.
async fn parse_reference(raw: &str) -> Result<Vec<f32>> {
    let text = if raw.trim_start().starts_with('[') {
        raw.to_string()
    } else {
        tokio::fs::read_to_string(raw)
            .await
            .with_context(|| format!("Failed to read reference vector from {raw}"))?
    };
    serde_json::from_str(&text).context("Reference must be a JSON array of numbers")
}

fn print_results(results: &[SearchResult]) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if results.is_empty() {
        writeln!(handle, "No tables found.").context("Failed to write to stdout")?;
        return Ok(());
    }
    for (rank, hit) in results.iter().enumerate() {
        writeln!(
            handle,
            "{} page {}  {}",
            bold(&format!("#{}", rank + 1)),
            hit.page_number,
            dim(&format!("distance {:.4}", hit.distance))
        )
        .context("Failed to write to stdout")?;
        writeln!(handle, "{}\n", hit.table).context("Failed to write to stdout")?;
    }
    Ok(())
}
