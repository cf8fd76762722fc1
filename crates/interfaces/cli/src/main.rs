mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use triage_config::TriageConfig;

#[derive(Debug, Parser)]
#[command(name = "triage", version, about = "Personal email intelligence and triage engine")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = "config/triage.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Initialize the data directory and write a default config.
    Init {
        #[command(subcommand)]
        command: InitCommands,
    },
    /// Run one pull cycle against the configured connector.
    Pull {
        /// How far back to pull from: an RFC3339 timestamp or a relative
        /// duration like "2h", "30m", "7d". Defaults to the saved cursor.
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        max: Option<usize>,
    },
    /// Run one analyze pass over pending messages.
    Triage {
        #[arg(long)]
        limit: Option<usize>,
        /// Compute and print decisions without persisting them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate the narrative brief for a day.
    Brief {
        /// YYYY-MM-DD, defaults to today.
        #[arg(long)]
        date: Option<String>,
    },
    /// Manage triage rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Submit a triage correction.
    Feedback {
        #[arg(long = "message-id")]
        message_id: String,
        #[arg(long)]
        corrected: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Score rule accuracy against feedback and synthesize/promote patterns.
    Learn,
}

#[derive(Debug, Subcommand)]
enum InitCommands {
    /// Create the data directory layout and a default config file.
    Setup,
}

#[derive(Debug, Subcommand)]
pub(crate) enum RulesCommands {
    /// List all rules with their priority, enabled state, and accuracy.
    List,
    /// Add or replace a rule from a JSON file.
    Add { file: PathBuf },
    /// Remove a rule by id.
    Remove { id: String },
    /// Dry-run a rule's conditions against a sample message file.
    Test {
        id: String,
        #[arg(long = "against")]
        against: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = match TriageConfig::load_from(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: failed to load config: {err:#}");
            return ExitCode::from(1);
        }
    };

    let _file_guard = init_tracing(&config.store.data_dir, &config.telemetry.log_level);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::from(commands::classify_exit_code(&err))
        }
    }
}

/// Stderr fmt layer plus a daily-rolling file sink under `<data_dir>/logs`
/// (§10.1), mirroring the teacher's `tracing-subscriber` setup, with the
/// rolling-file sink the teacher's own CLI declares as a dependency but
/// never wires up.
fn init_tracing(data_dir: &str, default_level: &str) -> tracing_appender::non_blocking::WorkerGuard {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_appender = tracing_appender::rolling::daily(std::path::Path::new(data_dir).join("logs"), "triage.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_filter(filter());
    let file_layer = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking).with_filter(filter());

    tracing_subscriber::registry().with(stderr_layer).with(file_layer).init();
    guard
}

async fn run(cli: Cli, config: TriageConfig) -> Result<()> {
    match cli.command {
        Commands::Init { command: InitCommands::Setup } => commands::init::run_setup(&cli.config, &config).await,
        Commands::Pull { since, max } => commands::pull::run_pull(&config, since, max).await,
        Commands::Triage { limit, dry_run } => commands::triage::run_triage(&config, limit, dry_run).await,
        Commands::Brief { date } => commands::brief::run_brief(&config, date).await,
        Commands::Rules { command } => commands::rules::run(&config, command).await,
        Commands::Feedback { message_id, corrected, note } => commands::feedback::run_feedback(&config, message_id, corrected, note).await,
        Commands::Learn => commands::learn::run_learn(&config).await,
    }
}
