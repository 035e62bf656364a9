//! # kiosk-realtime
//!
//! Client side of the kiosk's live push channel:
//!
//! - Wire message types (`healthData`, `queueUpdate`, keepalive)
//! - Normalisation of partial device payloads into per-metric events
//! - A reconnecting WebSocket transport with an idle watchdog
//! - [`WsPushChannel`], the [`kiosk_core::traits::PushChannel`] implementation

pub mod connection;
pub mod message;

pub use connection::client::WsPushChannel;
