//! Configuration file management commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use specflow_config::{
    AnalyzerConfig, config_name_from_path, default_config_path, ensure_user_config_dir,
    list_configs, user_config_dir,
};

use super::common::load_config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print a configuration as TOML
    Show {
        /// Configuration name or path (default: the user configuration file)
        name: Option<String>,
    },

    /// Write the default configuration to a file
    Init {
        /// Destination (default: the user configuration file)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration and print the derived analysis parameters
    Check {
        /// Configuration name or path (default: the user configuration file)
        name: Option<String>,
    },

    /// List configurations in the user configuration directory
    List,

    /// Show configuration directories
    Paths,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show { name } => {
            let config = load_config(name.as_deref())?;
            print!("{}", config.to_toml()?);
        }
        ConfigCommand::Init { path, force } => {
            let path = match path {
                Some(path) => path,
                None => {
                    ensure_user_config_dir()?;
                    default_config_path()
                }
            };
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            AnalyzerConfig::default().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        ConfigCommand::Check { name } => {
            let settings = load_config(name.as_deref())?.into_settings()?;
            println!("Configuration is valid");
            println!("  Sample rate:  {} Hz", settings.sample_rate);
            println!("  Channels:     {}", settings.channels);
            println!(
                "  Block:        {} samples ({:.2} Hz per bin)",
                settings.block_size,
                f64::from(settings.sample_rate) / settings.block_size as f64
            );
            println!("  Hop:          {} samples", settings.hop_size());
            println!("  Cropped bins: {}", settings.cropped_len());
            if !settings.block_size.is_power_of_two() {
                println!("  Note: power-of-two block sizes transform fastest");
            }
        }
        ConfigCommand::List => {
            let configs = list_configs();
            if configs.is_empty() {
                println!("No configurations in {}", user_config_dir().display());
            }
            for path in configs {
                if let Some(name) = config_name_from_path(&path) {
                    println!("{name:<20} {}", path.display());
                }
            }
        }
        ConfigCommand::Paths => {
            println!("Config directory: {}", user_config_dir().display());
            println!("Default file:     {}", default_config_path().display());
        }
    }
    Ok(())
}
