//! # kiosk-registry
//!
//! `reqwest` implementation of [`kiosk_core::traits::RegistryClient`]
//! against the registry's JSON API. Every response is wrapped in the
//! registry's `{success, data, message}` envelope.

pub mod client;
pub mod envelope;

pub use client::HttpRegistryClient;
