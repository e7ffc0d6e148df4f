//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use tracing::info;

use kyukou_scrape::Scraper;
use kyukou_shared::types::Severity;
use kyukou_shared::{AppConfig, init_config, load_config, resolve_db_path};
use kyukou_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// kyukou — ingest class-cancellation announcements.
#[derive(Parser)]
#[command(
    name = "kyukou",
    version,
    about = "Scrape institutional notice boards into a deduplicated event store.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Database path (overrides the config file).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

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
    /// Ingest all configured sources (or one, with --source).
    Run {
        /// Only ingest the source with this name.
        #[arg(short, long)]
        source: Option<String>,
    },

    /// List stored events, soonest first.
    Events {
        /// Maximum number of events to show.
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Show recent task log entries.
    Logs {
        /// Maximum number of entries to show.
        #[arg(short, long, default_value = "20")]
        limit: u32,
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
        0 => "kyukou=info",
        1 => "kyukou=debug",
        _ => "kyukou=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run { ref source } => cmd_run(&cli, source.as_deref()).await,
        Command::Events { limit } => cmd_events(&cli, limit).await,
        Command::Logs { limit } => cmd_logs(&cli, limit).await,
        Command::Config { ref action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Open the store at the flag-, config-, or default-resolved path.
async fn open_storage(cli: &Cli, config: &AppConfig) -> Result<Storage> {
    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => resolve_db_path(config)?,
    };
    Ok(Storage::open(&db_path).await?)
}

async fn cmd_run(cli: &Cli, only: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(cli, &config).await?;
    let scraper = Scraper::new(Duration::from_secs(config.defaults.timeout_secs))?;

    let sources: Vec<_> = match only {
        Some(name) => {
            let matched: Vec<_> = config.sources.iter().filter(|s| s.name == name).collect();
            if matched.is_empty() {
                return Err(eyre!("no source named '{name}' in the configuration"));
            }
            matched
        }
        None => config.sources.iter().collect(),
    };

    for source in sources {
        info!(source = %source.name, url = %source.url, "ingesting source");
        let entry = kyukou_core::run_and_log(&scraper, source, &storage).await?;
        println!(
            "  [{}] {} ({:.1}ms)",
            level_label(entry.level),
            entry.message,
            entry.elapsed_ms
        );
    }

    Ok(())
}

async fn cmd_events(cli: &Cli, limit: u32) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(cli, &config).await?;

    let events = storage.list_events(limit).await?;
    if events.is_empty() {
        println!("no events stored");
        return Ok(());
    }

    for event in events {
        println!(
            "  {}  {}",
            event.event_date.format("%Y-%m-%d"),
            event.summary_text()
        );
    }

    Ok(())
}

async fn cmd_logs(cli: &Cli, limit: u32) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(cli, &config).await?;

    let logs = storage.list_task_logs(limit).await?;
    if logs.is_empty() {
        println!("no task logs recorded");
        return Ok(());
    }

    for entry in logs {
        println!(
            "  {}  [{}] {} ({:.1}ms)",
            entry.time.format("%Y-%m-%d %H:%M:%S"),
            level_label(entry.level),
            entry.message,
            entry.elapsed_ms
        );
    }

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("wrote default config to {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let rendered = toml::to_string_pretty(&config)?;
    println!("{rendered}");
    Ok(())
}

fn level_label(level: u8) -> &'static str {
    match Severity::from_level(level) {
        Some(Severity::Info) => "info",
        Some(Severity::Notice) => "notice",
        Some(Severity::Warning) => "warning",
        Some(Severity::Error) => "error",
        None => "unknown",
    }
}
