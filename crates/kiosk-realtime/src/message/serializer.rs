//! JSON (de)serialization for push channel frames.

use chrono::{DateTime, Utc};

use kiosk_core::traits::ChannelSignal;

use super::types::{InboundMessage, OutboundMessage};

/// What a decoded frame asks the transport to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Forward these signals to the session.
    Signals(Vec<ChannelSignal>),
    /// Answer the server.
    Reply(String),
    /// Nothing to do.
    Ignore,
}

/// Serialize an outbound message.
pub fn serialize_outbound(msg: &OutboundMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

/// Deserialize an inbound message.
pub fn deserialize_inbound(text: &str) -> Result<InboundMessage, serde_json::Error> {
    serde_json::from_str(text)
}

/// Decode one text frame.
pub fn decode_frame(text: &str, received_at: DateTime<Utc>) -> Result<Decoded, serde_json::Error> {
    let decoded = match deserialize_inbound(text)? {
        InboundMessage::HealthData(payload) => Decoded::Signals(
            payload
                .into_events(received_at)
                .into_iter()
                .map(ChannelSignal::Telemetry)
                .collect(),
        ),
        InboundMessage::QueueUpdate {
            user_id,
            can_proceed,
        } => Decoded::Signals(vec![ChannelSignal::QueueUpdate {
            session_id: user_id,
            can_proceed,
        }]),
        InboundMessage::Ping { timestamp } => {
            Decoded::Reply(serialize_outbound(&OutboundMessage::Pong { timestamp })?)
        }
        InboundMessage::Subscribed { channel } => {
            tracing::debug!(channel = %channel, "Subscription confirmed");
            Decoded::Ignore
        }
        InboundMessage::Error { message } => {
            tracing::warn!(message = %message, "Push channel error from server");
            Decoded::Ignore
        }
    };
    Ok(decoded)
}
