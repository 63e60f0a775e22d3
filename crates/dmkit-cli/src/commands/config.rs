//! Configuration management commands

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Initialize configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn run(cmd: ConfigCommands, config: &Config) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(config),
        ConfigCommands::Init { force } => init(force),
    }
}

fn show(config: &Config) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    match Config::find_config_file() {
        Some(path) => println!("Config file: {}\n", path.display()),
        None => println!("No configuration file found. Using defaults.\n"),
    }

    println!("{}", config.to_toml()?);
    Ok(())
}

fn init(force: bool) -> Result<()> {
    let config_path = "dmkit.toml";

    if std::path::Path::new(config_path).exists() && !force {
        println!("Configuration file already exists: {config_path}");
        println!("Use --force to overwrite");
        return Ok(());
    }

    std::fs::write(config_path, Config::default().to_toml()?)?;
    println!("Configuration written to {config_path}");
    Ok(())
}
