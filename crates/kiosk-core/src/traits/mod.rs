//! Collaborator traits defined in `kiosk-core` and implemented by the
//! transport crates (or by in-memory fakes in tests).

pub mod channel;
pub mod registry;

pub use channel::{ChannelHandle, ChannelSignal, PushChannel, Subscription};
pub use registry::RegistryClient;
