//! ParkSlots CLI - Command-line interface for the parking slots list
//!
//! Provides commands for:
//! - Signing in and out of Microsoft 365
//! - Listing, querying, and editing parking slots
//! - Inspecting the local identifier cache
//! - Viewing and validating configuration

use anyhow::Result;
use clap::{Parser, Subcommand};
use parkslots_core::config::Config;
use tracing_subscriber::EnvFilter;

mod app;
mod commands;
mod output;

use app::AppContext;
use commands::{
    auth::AuthCommand, cache::CacheCommand, completions::CompletionsCommand,
    config::ConfigCommand, slots::SlotsCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "parkslots",
    version,
    about = "Manage the SharePoint parking slots list"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Authentication commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Query and edit parking slots
    #[command(subcommand)]
    Slots(SlotsCommand),
    /// Inspect or clear cached site and list identifiers
    #[command(subcommand)]
    Cache(CacheCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Picks the log filter: `-q`, then `-v` count, then `logging.level`
fn log_directive(cli: &Cli, config: &Config) -> String {
    if cli.quiet {
        return "error".to_string();
    }
    match cli.verbose {
        0 => config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn init_tracing(cli: &Cli, config: &Config) {
    // RUST_LOG wins over everything else
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directive(cli, config)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = AppContext::load(cli.config.as_deref())?;
    init_tracing(&cli, &ctx.config);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Auth(ref cmd) => cmd.execute(&ctx, format).await,
        Commands::Slots(ref cmd) => cmd.execute(&ctx, format).await,
        Commands::Cache(ref cmd) => cmd.execute(&ctx, format).await,
        Commands::Config(ref cmd) => cmd.execute(&ctx, format).await,
        Commands::Completions(ref cmd) => cmd.execute(format).await,
    }
}
