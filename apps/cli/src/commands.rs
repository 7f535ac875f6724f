//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use askweb_core::{Answer, ContextPipeline, ProgressReporter};
use askweb_document::PdfTextExtractor;
use askweb_model::{AnswerModel, ModelClient};
use askweb_render::PlaywrightRenderer;
use askweb_search::SearchClient;
use askweb_shared::{AppConfig, ModelBackend, init_config, load_config, resolve_api_key};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// askweb: answer questions from live web sources.
#[derive(Parser)]
#[command(
    name = "askweb",
    version,
    about = "Answer questions with a generative model grounded on the top web results.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
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
    /// Search the web, build a context from the top results, and ask the model.
    Ask {
        /// The question to answer.
        question: String,

        /// Reference PDF; only web passages relevant to it are used.
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Number of distinct-domain sources to use.
        #[arg(short, long)]
        urls: Option<usize>,

        /// Model backend: palm2 or gemini-pro.
        #[arg(short, long)]
        model: Option<ModelBackend>,

        /// Keep the per-query scratch directory for inspection.
        #[arg(long)]
        keep_scratch: bool,

        /// Print the answer and its sources as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show which sources a question would use, without rendering them.
    Search {
        /// Search query.
        query: String,

        /// Number of distinct-domain sources to select.
        #[arg(short, long)]
        urls: Option<usize>,

        /// Print the selection as JSON.
        #[arg(long)]
        json: bool,
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

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "askweb=info",
        1 => "askweb=debug",
        _ => "askweb=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
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
        Command::Ask {
            question,
            reference,
            urls,
            model,
            keep_scratch,
            json,
        } => {
            let opts = AskOptions {
                reference,
                urls,
                model,
                keep_scratch,
                json,
            };
            cmd_ask(&question, opts).await
        }
        Command::Search { query, urls, json } => cmd_search(&query, urls, json).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Flags of the `ask` command.
struct AskOptions {
    reference: Option<PathBuf>,
    urls: Option<usize>,
    model: Option<ModelBackend>,
    keep_scratch: bool,
    json: bool,
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_ask(question: &str, opts: AskOptions) -> Result<()> {
    let mut config = load_config()?;
    if let Some(backend) = opts.model {
        config.model.backend = backend;
    }
    if opts.keep_scratch {
        config.pipeline.keep_scratch = true;
    }
    let urls_count = opts.urls.unwrap_or(config.defaults.urls_count);

    if let Some(path) = &opts.reference {
        if !path.is_file() {
            return Err(eyre!("reference PDF '{}' does not exist", path.display()));
        }
    }

    // Fail on a missing key before any network or browser work.
    let api_key = resolve_api_key(&config)?;

    info!(
        urls_count,
        backend = %config.model.backend,
        reference = opts.reference.is_some(),
        "answering question"
    );

    let reporter = CliProgress::new();
    reporter.phase("Connecting to the model");
    let mut model = ModelClient::new(&config.model)?;
    if let Err(e) = model.initialize(&api_key).await {
        reporter.clear();
        return Err(e.into());
    }

    let pipeline = ContextPipeline::new(
        &config,
        PlaywrightRenderer::new(&config.render),
        PdfTextExtractor,
        model,
    )?;

    let answer = pipeline
        .answer(question, opts.reference.as_deref(), urls_count, &reporter)
        .await;
    reporter.clear();
    let answer = answer?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!();
    println!("{}", answer.text.trim());
    println!();
    if answer.sources.is_empty() {
        println!("  Sources: none found");
    } else {
        println!("  Sources:");
        for (i, url) in answer.sources.urls.iter().enumerate() {
            println!("  {:>2}. {url}", i + 1);
        }
    }
    println!();

    Ok(())
}

async fn cmd_search(query: &str, urls: Option<usize>, json: bool) -> Result<()> {
    let config = load_config()?;
    let count = urls.unwrap_or(config.defaults.urls_count);

    let client = SearchClient::new(&config.search)?;
    let selection = client.top_urls(query, count).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&selection)?);
        return Ok(());
    }

    if selection.is_empty() {
        println!("No sources found for '{query}'.");
        return Ok(());
    }
    for (i, result) in selection.iter().enumerate() {
        println!("{:>2}. [{}] {}", i + 1, result.domain_key, result.url);
    }

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn clear(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn source_rendered(&self, url: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Rendered [{current}/{total}] {url}"));
    }

    fn done(&self, _answer: &Answer) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ask_with_overrides() {
        let cli = Cli::try_parse_from([
            "askweb",
            "ask",
            "How does photosynthesis work?",
            "--urls",
            "3",
            "--model",
            "gemini-pro",
            "--reference",
            "notes.pdf",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Ask {
                question,
                reference,
                urls,
                model,
                keep_scratch,
                json,
            } => {
                assert_eq!(question, "How does photosynthesis work?");
                assert_eq!(reference, Some(PathBuf::from("notes.pdf")));
                assert_eq!(urls, Some(3));
                assert_eq!(model, Some(ModelBackend::GeminiPro));
                assert!(!keep_scratch);
                assert!(!json);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn unknown_backend_rejected() {
        let result = Cli::try_parse_from(["askweb", "ask", "q", "--model", "gpt-4"]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_search_and_config() {
        let cli = Cli::try_parse_from(["askweb", "--log-format", "json", "search", "rust"]).unwrap();
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert!(matches!(cli.command, Command::Search { urls: None, json: false, .. }));

        let cli = Cli::try_parse_from(["askweb", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));
    }
}
