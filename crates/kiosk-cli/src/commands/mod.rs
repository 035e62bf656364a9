//! CLI command definitions and dispatch.

pub mod config;
pub mod profile;
pub mod queue;

use clap::{Parser, Subcommand};

use crate::output::{OutputFormat, Printer};
use kiosk_core::config::AppConfig;
use kiosk_core::error::AppError;
use kiosk_registry::HttpRegistryClient;

/// Health kiosk operator tools
#[derive(Debug, Parser)]
#[command(name = "kiosk-cli", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Inspect or release queued sessions
    Queue(queue::QueueArgs),
    /// Check or register visitor profiles
    Profile(profile::ProfileArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let out = Printer::new(self.format);
        match &self.command {
            Commands::Queue(args) => queue::execute(args, &self.config, out).await,
            Commands::Profile(args) => profile::execute(args, &self.config, out).await,
            Commands::Config(args) => config::execute(args, &self.config, out).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Helper: configuration plus a registry client built from it
pub fn connect(config_path: &str) -> Result<(AppConfig, HttpRegistryClient), AppError> {
    let config = load_config(config_path)?;
    let registry = HttpRegistryClient::new(&config.registry)?;
    Ok((config, registry))
}
