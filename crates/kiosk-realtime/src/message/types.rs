//! Inbound and outbound push channel message type definitions.

use serde::{Deserialize, Serialize};

use kiosk_core::types::SessionId;

use super::health::HealthPayload;

/// Messages sent by the server to the kiosk.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum InboundMessage {
    /// Device readings; any subset of the metrics.
    #[serde(rename = "healthData")]
    HealthData(HealthPayload),
    /// Queue admission change for one session.
    #[serde(rename = "queueUpdate")]
    QueueUpdate {
        /// Session addressed.
        #[serde(rename = "userId")]
        user_id: SessionId,
        /// Whether it may proceed.
        #[serde(rename = "canProceed")]
        can_proceed: bool,
    },
    /// Server keepalive.
    #[serde(rename = "ping")]
    Ping {
        /// Server timestamp, echoed back.
        #[serde(default)]
        timestamp: i64,
    },
    /// Subscription confirmed.
    #[serde(rename = "subscribed")]
    Subscribed {
        /// Channel name.
        channel: String,
    },
    /// Server-side error report.
    #[serde(rename = "error")]
    Error {
        /// Error description.
        message: String,
    },
}

/// Messages sent by the kiosk to the server.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Subscribe to a channel on behalf of a session.
    Subscribe {
        /// Channel name (`queue` or `telemetry`).
        channel: String,
        /// Session the subscription belongs to.
        #[serde(rename = "userId")]
        user_id: SessionId,
    },
    /// Reply to a server ping.
    Pong {
        /// Echoed timestamp.
        timestamp: i64,
    },
}
