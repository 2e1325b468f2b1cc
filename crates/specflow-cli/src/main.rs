//! Specflow CLI - drive the streaming spectrum analyzer from a terminal.

mod commands;
mod render;
mod source;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "specflow")]
#[command(author, version, about = "Streaming spectrum analyzer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a synthetic stereo tone in real time
    Run(commands::run::RunArgs),

    /// Show, create and check configuration files
    Config(commands::config::ConfigArgs),

    /// List windows, scales and the effective analysis parameters
    Info(commands::info::InfoArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Config(args) => commands::config::run(args),
        Commands::Info(args) => commands::info::run(args),
    }
}
