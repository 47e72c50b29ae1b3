//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use docfetch_core::{BatchProcessor, ProgressReporter, ToolResponse, tool_definition};
use docfetch_shared::{
    AppConfig, BatchOptions, BatchResult, DocFetchError, ProcessedDocument, init_config,
    load_config,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docfetch: fetch many URLs at once and convert them to Markdown.
#[derive(Parser)]
#[command(
    name = "docfetch",
    version,
    about = "Fetch web pages concurrently and convert them to Markdown documents.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch URLs and print the batch result as JSON.
    Fetch {
        /// URLs to fetch.
        urls: Vec<String>,

        /// File with one URL per line (blank lines and `#` comments ignored).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Maximum concurrent fetches (overrides config).
        #[arg(short = 'w', long)]
        max_workers: Option<usize>,

        /// Per-URL timeout in seconds (overrides config).
        #[arg(short, long)]
        timeout: Option<f64>,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },

    /// Run a raw tool call, as an agent framework would.
    Tool {
        /// Tool-call arguments as a JSON object.
        #[arg(long, required_unless_present = "schema", conflicts_with = "schema")]
        args: Option<String>,

        /// Print the tool definition instead of running it.
        #[arg(long)]
        schema: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries JSON.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docfetch=info",
        1 => "docfetch=debug",
        _ => "docfetch=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Fetch {
            urls,
            input,
            max_workers,
            timeout,
            pretty,
        } => cmd_fetch(urls, input.as_deref(), max_workers, timeout, pretty).await,
        Command::Tool { args, schema } => cmd_tool(args.as_deref(), schema).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

async fn cmd_fetch(
    mut urls: Vec<String>,
    input: Option<&Path>,
    max_workers: Option<usize>,
    timeout: Option<f64>,
    pretty: bool,
) -> Result<()> {
    let config = load_config()?;

    if let Some(path) = input {
        let text = std::fs::read_to_string(path)
            .map_err(|e| eyre!("cannot read URL list '{}': {e}", path.display()))?;
        urls.extend(parse_url_lines(&text));
    }

    let mut options = BatchOptions::from(&config);
    if let Some(n) = max_workers {
        options = options.with_max_workers(n);
    }
    if let Some(secs) = timeout {
        let timeout = Duration::try_from_secs_f64(secs)
            .map_err(|_| eyre!("--timeout must be a non-negative number of seconds"))?;
        options = options.with_timeout(timeout);
    }

    info!(
        urls = urls.len(),
        max_workers = options.max_workers,
        timeout_s = options.timeout.as_secs_f64(),
        "fetching"
    );

    let progress = Arc::new(CliProgress::new());
    let processor = BatchProcessor::from_config(&config)?.with_progress(progress.clone());
    let response = processor.process_multiple_urls(urls, &options).await;
    progress.finish();

    print_json(&response.to_value(), pretty)
}

async fn cmd_tool(args: Option<&str>, schema: bool) -> Result<()> {
    if schema {
        return print_json(&tool_definition(), true);
    }

    let config = load_config()?;
    let defaults = BatchOptions::from(&config);
    let processor = BatchProcessor::from_config(&config)?;

    let raw = args.unwrap_or("{}");
    let response = match serde_json::from_str::<Value>(raw) {
        Ok(args) => processor.handle_tool_call(&args, &defaults).await,
        Err(e) => ToolResponse::from_error(
            &DocFetchError::validation(format!("tool arguments are not valid JSON: {e}")),
            0,
        ),
    };

    print_json(&response.to_value(), true)
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn print_json(value: &Value, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

/// One URL per non-blank line; `#` starts a comment line.
fn parse_url_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner on stderr; indicatif hides it when stderr is not a terminal.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn batch_started(&self, total: usize, invalid: usize) {
        if invalid > 0 {
            self.spinner
                .set_message(format!("Fetching {total} URLs ({invalid} invalid skipped)"));
        } else {
            self.spinner.set_message(format!("Fetching {total} URLs"));
        }
    }

    fn document_finished(&self, document: &ProcessedDocument, completed: usize, total: usize) {
        let mark = if document.is_success() { "ok" } else { "failed" };
        self.spinner
            .set_message(format!("[{completed}/{total}] {mark} {}", document.url()));
    }

    fn batch_finished(&self, _result: &BatchResult) {
        self.spinner.finish_and_clear();
    }
}
