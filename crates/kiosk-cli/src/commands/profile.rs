//! Visitor profile commands.

use std::path::Path;

use clap::{Args, Subcommand};

use crate::output::{Outcome, Printer};
use kiosk_core::error::AppError;
use kiosk_core::traits::RegistryClient;
use kiosk_core::types::Profile;

/// Arguments for profile commands
#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Profile subcommand
    #[command(subcommand)]
    pub command: ProfileCommand,
}

/// Profile subcommands
#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Validate a profile JSON file without contacting the registry
    Check {
        /// Path to the profile JSON
        path: String,
    },
    /// Register a profile and print the issued session ID
    Register {
        /// Path to the profile JSON
        path: String,
    },
}

/// Execute profile commands
pub async fn execute(args: &ProfileArgs, config_path: &str, out: Printer) -> Result<(), AppError> {
    match &args.command {
        ProfileCommand::Check { path } => {
            let profile = read_profile(path).await?;
            profile.check()?;
            out.note(Outcome::Ok, &format!("Profile '{path}' is valid"));
            out.fields(&[
                ("Name", format!("{} {}", profile.first_name, profile.last_name)),
                ("Email", profile.email.clone()),
                ("Age", profile.age.to_string()),
            ]);
        }
        ProfileCommand::Register { path } => {
            let profile = read_profile(path).await?;
            profile.check()?;
            let (_, registry) = super::connect(config_path)?;
            let session_id = registry.register(&profile).await?;
            out.note(Outcome::Ok, "Visitor registered");
            out.fields(&[("Session", session_id.to_string())]);
        }
    }

    Ok(())
}

async fn read_profile(path: &str) -> Result<Profile, AppError> {
    let raw = tokio::fs::read_to_string(Path::new(path))
        .await
        .map_err(|e| AppError::validation(format!("Cannot read '{path}': {e}")))?;
    serde_json::from_str(&raw).map_err(AppError::from)
}
