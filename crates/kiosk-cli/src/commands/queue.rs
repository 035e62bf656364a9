//! Queue inspection and release commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{Outcome, Printer};
use kiosk_core::error::AppError;
use kiosk_core::traits::RegistryClient;
use kiosk_core::types::SessionId;

/// Arguments for queue commands
#[derive(Debug, Args)]
pub struct QueueArgs {
    /// Queue subcommand
    #[command(subcommand)]
    pub command: QueueCommand,
}

/// Queue subcommands
#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// Show where sessions stand in the queue
    Status {
        /// Session IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Remove a session from the queue (or free the device it holds)
    Leave {
        /// Session ID
        id: String,
    },
    /// Mark a session's visit complete and free the device
    Complete {
        /// Session ID
        id: String,
    },
}

/// Queue status display row
#[derive(Debug, Serialize, Tabled)]
struct StatusRow {
    /// Session ID
    session: String,
    /// May use the device
    admitted: String,
    /// Position
    position: String,
    /// Waiting
    total: u32,
    /// Estimated wait
    wait: String,
}

/// Execute queue commands
pub async fn execute(
    args: &QueueArgs,
    config_path: &str,
    out: Printer,
) -> Result<(), AppError> {
    let (config, registry) = super::connect(config_path)?;

    match &args.command {
        QueueCommand::Status { ids } => {
            let mut rows = Vec::with_capacity(ids.len());
            for id in ids {
                let session_id = SessionId::from(id.as_str());
                match registry.queue_status(&session_id).await {
                    Ok(status) => {
                        let (position, total) = status.queue_slot();
                        rows.push(StatusRow {
                            session: session_id.to_string(),
                            admitted: if status.can_proceed { "✓" } else { "✗" }.to_string(),
                            position: status
                                .position
                                .map_or_else(|| "-".to_string(), |_| position.to_string()),
                            total,
                            wait: if status.can_proceed {
                                "-".to_string()
                            } else {
                                format!(
                                    "~{} min",
                                    status.estimated_wait_minutes(
                                        config.admission.minutes_per_position
                                    )
                                )
                            },
                        });
                    }
                    Err(e) => out.note(Outcome::Warning, &format!("{session_id}: {e}")),
                }
            }
            out.rows(&rows, "No queue status available.")?;
        }
        QueueCommand::Leave { id } => {
            let session_id = SessionId::from(id.as_str());
            registry.leave(&session_id).await?;
            out.note(Outcome::Ok, &format!("Session '{session_id}' left the queue"));
        }
        QueueCommand::Complete { id } => {
            let session_id = SessionId::from(id.as_str());
            registry.complete(&session_id).await?;
            out.note(Outcome::Ok, &format!("Session '{session_id}' completed"));
        }
    }

    Ok(())
}
