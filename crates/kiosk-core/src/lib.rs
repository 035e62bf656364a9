//! # kiosk-core
//!
//! Core crate for the walk-up health kiosk. Contains configuration schemas,
//! typed identifiers, profile and reading types, the collaborator traits
//! consumed by the session state machine, domain events, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other kiosk crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
