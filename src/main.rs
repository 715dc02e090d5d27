//! # Doc Analyzer CLI (`analyzer`)
//!
//! The `analyzer` binary runs the analysis pipeline over the configured
//! folders and regenerates the Word report and RIS bibliography.
//!
//! ## Usage
//!
//! ```bash
//! analyzer --config ./config/analyzer.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `analyzer run` | Analyze new files, then write report and RIS export |
//! | `analyzer report` | Rewrite report and RIS export from the ledger only |
//! | `analyzer status` | Print ledger statistics |
//!
//! ## Examples
//!
//! ```bash
//! # See what a run would pick up
//! analyzer run --dry-run
//!
//! # Analyze at most 10 new files from a different folder
//! analyzer run --folder ~/Forskning/2024 --limit 10
//!
//! # Start over
//! analyzer run --reset
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use doc_analyzer::config::{self, Config};
use doc_analyzer::discover::Discoverer;
use doc_analyzer::error::OutputError;
use doc_analyzer::export::{self, RenderedOutput};
use doc_analyzer::ledger::LedgerStore;
use doc_analyzer::llm::AnthropicClient;
use doc_analyzer::models::Ledger;
use doc_analyzer::output::{retry_while_locked, write_output};
use doc_analyzer::pipeline::{self, RunOptions, RunSummary};
use doc_analyzer::progress::ProgressMode;
use doc_analyzer::stats;

/// How often a locked output is retried before it is skipped.
const MAX_LOCK_ATTEMPTS: usize = 5;

/// Doc Analyzer: incremental document analysis with a Word report and
/// RIS export.
///
/// Reads the TOML configuration given by `--config`. The Anthropic API key
/// is taken from `ANTHROPIC_API_KEY`, which may also be set in a `.env` file.
#[derive(Parser)]
#[command(
    name = "analyzer",
    about = "Incremental document analysis with a Word report and RIS export",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/analyzer.toml")]
    config: PathBuf,

    /// More log output (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze new documents, then write the report and RIS export.
    ///
    /// Files already in the ledger are never sent again. Files that could
    /// not be read or analyzed are left out of the ledger and retried on the
    /// next run.
    Run {
        /// Root folder to scan; repeat for several. Overrides `folders`.
        #[arg(long = "folder")]
        folders: Vec<PathBuf>,

        /// Skip the RIS export; the report is still written.
        #[arg(long)]
        no_export: bool,

        /// Delete the ledger before scanning, re-analyzing everything.
        #[arg(long)]
        reset: bool,

        /// List the files that would be analyzed and exit.
        #[arg(long)]
        dry_run: bool,

        /// Analyze at most this many new files.
        #[arg(long)]
        limit: Option<usize>,

        /// Progress output on stderr. Defaults to `human` on a terminal.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Rewrite the report and RIS export from the ledger.
    Report {
        /// Root folder whose output directory receives the files.
        #[arg(long = "folder")]
        folders: Vec<PathBuf>,

        /// Skip the RIS export.
        #[arg(long)]
        no_export: bool,
    },

    /// Show ledger statistics.
    Status,
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = match cli.verbose {
        0 => "warn,doc_analyzer=info",
        1 => "warn,doc_analyzer=debug",
        _ => "warn,doc_analyzer=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match cli.log_format {
        LogFormat::Text => fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(&cli);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Run {
            folders,
            no_export,
            reset,
            dry_run,
            limit,
            progress,
        } => {
            let cfg = cfg.with_folders(folders);
            let options = RunOptions { reset, limit };
            if dry_run {
                return dry_run_listing(&cfg, &options);
            }

            let model = AnthropicClient::from_env(&cfg.anthropic)?;
            let reporter = progress.unwrap_or_else(ProgressMode::default_for_tty).reporter();
            let summary = pipeline::run_pipeline(&cfg, &model, &options, reporter.as_ref()).await?;
            print_summary(&summary);

            let ledger = LedgerStore::new(&cfg.output.ledger).load()?;
            write_outputs(&cfg, &ledger, !no_export)?;
        }
        Commands::Report { folders, no_export } => {
            let cfg = cfg.with_folders(folders);
            let ledger = LedgerStore::new(&cfg.output.ledger).load()?;
            write_outputs(&cfg, &ledger, !no_export)?;
        }
        Commands::Status => {
            stats::run_stats(&cfg)?;
        }
    }

    Ok(())
}

/// Prints the worklist without calling the model or touching the ledger.
fn dry_run_listing(cfg: &Config, options: &RunOptions) -> Result<()> {
    let store = LedgerStore::new(&cfg.output.ledger);
    let ledger = if options.reset {
        Ledger::new()
    } else {
        store.load()?
    };
    let mut discovery = Discoverer::from_config(cfg)?.scan(&cfg.folders, &ledger)?;
    if let Some(limit) = options.limit {
        discovery.new_files.truncate(limit);
    }

    println!("Dry run (nothing is analyzed or written)");
    println!("  already processed: {}", discovery.already_processed);
    println!("  new files:         {}", discovery.new_files.len());
    for path in &discovery.new_files {
        println!("    {}", path.display());
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{} analyzed, {} skipped, {} failed ({} already processed)",
        summary.recorded.len(),
        summary.skipped.len(),
        summary.failed.len(),
        summary.already_processed
    );
    for (path, error) in &summary.failed {
        println!("  failed: {} ({})", path.display(), error);
    }
}

fn write_outputs(cfg: &Config, ledger: &Ledger, include_bibliography: bool) -> Result<()> {
    for output in export::render_outputs(cfg, ledger, include_bibliography)? {
        match write_with_prompt(&output) {
            Ok(true) => println!(
                "{} written: {} ({} entries)",
                output.kind,
                output.path.display(),
                output.entries
            ),
            Ok(false) => eprintln!("{} skipped: {}", output.kind, output.path.display()),
            Err(e) => eprintln!("error: could not write {}: {}", output.kind, e),
        }
    }
    Ok(())
}

/// Writes one output, asking the user to close the file while it is locked.
fn write_with_prompt(output: &RenderedOutput) -> Result<bool, OutputError> {
    retry_while_locked(
        MAX_LOCK_ATTEMPTS,
        &mut std::io::stdin().lock(),
        &mut std::io::stderr(),
        || write_output(&output.path, &output.bytes),
    )
}
