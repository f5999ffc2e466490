use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod input;
mod session;

#[derive(Parser)]
#[command(name = "devek", about = "Stream editor changes to Devek.dev")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pair this device with your Devek.dev account
    Login,
    /// Forget the stored login
    Logout,
    /// Show connection status
    Status,
    /// Reconnect with the stored login
    Reconnect,
    /// Stream edits read from stdin as JSON lines
    Connect(commands::connect::ConnectArgs),
    /// Open the Devek.dev app or documentation
    Open(commands::open::OpenArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Login => commands::login::run().await,
        Commands::Logout => commands::logout::run().await,
        Commands::Status => commands::status::run().await,
        Commands::Reconnect => commands::reconnect::run().await,
        Commands::Connect(args) => commands::connect::run(args).await,
        Commands::Open(args) => commands::open::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}

/// `RUST_LOG` when set, otherwise `debug` or `info` depending on `--verbose`
fn log_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }))
}
