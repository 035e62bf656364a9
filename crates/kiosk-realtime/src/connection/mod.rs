//! Push channel connection handling.

pub mod backoff;
pub mod client;
pub mod transport;
