//! jsqlon CLI
//!
//! Runs one reconciliation pass between a SQLite database and its
//! `<database>.json` backup.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use jsqlon_core::{Config, Session, SyncError};

mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "jsqlon")]
#[command(about = "jsqlon - Keep a SQLite database and its JSON backup in sync")]
#[command(version)]
struct Cli {
    /// SQLite database to reconcile (defaults to the configured one)
    path: Option<PathBuf>,

    /// Show what would happen without changing either file
    #[arg(long)]
    dry_run: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,

    /// More logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config = apply_flags(Config::load()?, &cli);
    init_logging(&config, cli.verbose);
    debug!("Using database {:?}", config.database_path);

    match Session::run(&config, |_| Ok::<_, SyncError>(())) {
        Ok(((), report)) => output.print_report(&report),
        Err(err) => {
            if let Some(hint) = err.recovery_suggestion() {
                eprintln!("Hint: {}", hint);
            }
            Err(err.into())
        }
    }
}

/// Command-line flags override the loaded configuration
fn apply_flags(mut config: Config, cli: &Cli) -> Config {
    if let Some(ref path) = cli.path {
        config.database_path = path.clone();
    }
    if cli.dry_run {
        config.dry_run = true;
    }
    config
}

/// Initialize stderr logging
///
/// RUST_LOG wins; otherwise the configured level, raised by each -v.
fn init_logging(config: &Config, verbose: u8) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config.log_level.contains('=') {
            return EnvFilter::new(&config.log_level);
        }
        let level = log_level(&config.log_level, verbose);
        EnvFilter::new(format!("jsqlon_core={},jsqlon={}", level, level))
    });

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn log_level(configured: &str, verbose: u8) -> &str {
    const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

    let Some(base) = LEVELS
        .iter()
        .position(|l| l.eq_ignore_ascii_case(configured))
    else {
        return configured;
    };
    LEVELS[(base + verbose as usize).min(LEVELS.len() - 1)]
}
