//! Push channel wire messages.

pub mod health;
pub mod serializer;
pub mod types;

pub use types::{InboundMessage, OutboundMessage};
