//! Core type definitions shared across the kiosk workspace.

pub mod id;
pub mod profile;
pub mod queue;
pub mod reading;
pub mod state;

pub use id::SessionId;
pub use profile::{Gender, Profile};
pub use queue::AdmissionStatus;
pub use reading::{Metric, ReadingSubmission, TelemetryEvent};
pub use state::{AdmissionState, AttemptState, ChannelState, ReleaseReason};
