//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output::{Outcome, Printer};
use kiosk_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Validate configuration file
    Validate,
    /// Generate a default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config/generated.toml")]
        output: String,
    },
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config_path: &str,
    out: Printer,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let config = super::load_config(config_path)?;
            out.config(&config)?;
        }
        ConfigCommand::Validate => match super::load_config(config_path) {
            Ok(config) => {
                out.note(Outcome::Ok, &format!("Configuration '{config_path}' is valid"));
                out.fields(&[
                    ("Registry", config.registry.base_url.clone()),
                    ("Telemetry", config.telemetry.ws_url.clone()),
                    (
                        "Poll interval",
                        format!("{}s", config.admission.poll_interval_seconds),
                    ),
                    (
                        "Occupancy limit",
                        format!("{}s", config.lifecycle.occupancy_timeout_seconds),
                    ),
                ]);
            }
            Err(e) => {
                out.note(Outcome::Error, &format!("Configuration invalid: {e}"));
                return Err(e);
            }
        },
        ConfigCommand::Generate { output: out_path } => {
            let default_config = include_str!("../../../../config/default.toml");

            if let Some(parent) = std::path::Path::new(out_path).parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::internal(format!("Failed to create dir: {e}")))?;
            }

            tokio::fs::write(out_path, default_config)
                .await
                .map_err(|e| AppError::internal(format!("Failed to write config: {e}")))?;

            out.note(Outcome::Ok, &format!("Default config written to '{out_path}'"));
        }
    }

    Ok(())
}
