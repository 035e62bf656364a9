//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section; every field carries a default so an empty file is valid.

pub mod admission;
pub mod lifecycle;
pub mod logging;
pub mod registry;
pub mod telemetry;

use serde::{Deserialize, Serialize};

pub use self::admission::AdmissionConfig;
pub use self::lifecycle::LifecycleConfig;
pub use self::logging::LoggingConfig;
pub use self::registry::RegistryConfig;
pub use self::telemetry::TelemetryConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged configuration
/// (`config/default.toml`, the requested file, and `KIOSK__*` variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Session registry API settings.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Queue admission settings.
    #[serde(default)]
    pub admission: AdmissionConfig,
    /// Telemetry push channel settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Device occupancy timer settings.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `config/default`, the given file, and the
    /// environment (prefix `KIOSK`, separator `__`).
    pub fn load(path: &str) -> Result<Self, AppError> {
        tracing::debug!(path = %path, "Loading configuration");
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("KIOSK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate().inspect_err(|e| {
            tracing::warn!(path = %path, error = %e, "Configuration rejected");
        })?;
        Ok(config)
    }

    /// Reject settings the session state machine cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if !has_scheme(&self.registry.base_url, &["http://", "https://"]) {
            return Err(AppError::configuration(format!(
                "registry.base_url must be an http(s) URL, got '{}'",
                self.registry.base_url
            )));
        }
        if !has_scheme(&self.telemetry.ws_url, &["ws://", "wss://"]) {
            return Err(AppError::configuration(format!(
                "telemetry.ws_url must be a ws(s) URL, got '{}'",
                self.telemetry.ws_url
            )));
        }

        let non_zero = [
            (
                "registry.request_timeout_seconds",
                self.registry.request_timeout_seconds,
            ),
            (
                "admission.poll_interval_seconds",
                self.admission.poll_interval_seconds,
            ),
            (
                "telemetry.reconnect_initial_delay_ms",
                self.telemetry.reconnect_initial_delay_ms,
            ),
            (
                "telemetry.idle_timeout_seconds",
                self.telemetry.idle_timeout_seconds,
            ),
            (
                "telemetry.channel_buffer_size",
                self.telemetry.channel_buffer_size as u64,
            ),
            (
                "lifecycle.occupancy_timeout_seconds",
                self.lifecycle.occupancy_timeout_seconds,
            ),
            ("lifecycle.countdown_tick_ms", self.lifecycle.countdown_tick_ms),
        ];
        if let Some((name, _)) = non_zero.iter().find(|(_, value)| *value == 0) {
            return Err(AppError::configuration(format!("{name} must be > 0")));
        }

        if self.telemetry.reconnect_max_delay_ms < self.telemetry.reconnect_initial_delay_ms {
            return Err(AppError::configuration(
                "telemetry.reconnect_max_delay_ms must be >= reconnect_initial_delay_ms",
            ));
        }

        Ok(())
    }
}

fn has_scheme(url: &str, schemes: &[&str]) -> bool {
    schemes
        .iter()
        .any(|scheme| url.starts_with(scheme) && url.len() > scheme.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.admission.poll_interval_seconds, 5);
        assert_eq!(config.lifecycle.occupancy_timeout_seconds, 120);
        assert_eq!(config.admission.minutes_per_position, 2);
    }

    #[test]
    fn test_empty_source_uses_defaults() {
        let config: AppConfig = from_json("{}");
        assert_eq!(config.registry.base_url, "http://localhost:3000/api/v1");
        assert_eq!(config.telemetry.ws_url, "ws://localhost:3000/ws");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: AppConfig =
            from_json(r#"{"admission": {"poll_interval_seconds": 2}}"#);
        assert_eq!(config.admission.poll_interval_seconds, 2);
        assert_eq!(config.admission.minutes_per_position, 2);
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let mut config = AppConfig::default();
        config.admission.poll_interval_seconds = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.message.contains("admission.poll_interval_seconds"));
    }

    #[test]
    fn test_rejects_non_websocket_url() {
        let mut config = AppConfig::default();
        config.telemetry.ws_url = "http://localhost:3000".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_backoff() {
        let mut config = AppConfig::default();
        config.telemetry.reconnect_max_delay_ms = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_join() {
        let mut registry = RegistryConfig::default();
        registry.base_url = "http://host/api/v1/".to_string();
        assert_eq!(
            registry.endpoint("/queue/status"),
            "http://host/api/v1/queue/status"
        );
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load("config/does-not-exist").expect("load");
        assert_eq!(config.lifecycle.countdown_tick_ms, 1000);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!(
            "kiosk-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[lifecycle]\noccupancy_timeout_seconds = 0\n").expect("write");

        let result = AppConfig::load(path.to_str().expect("utf-8 path"));
        std::fs::remove_file(&path).ok();

        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.message.contains("lifecycle.occupancy_timeout_seconds"));
    }

    fn from_json(json: &str) -> AppConfig {
        let config = config::Config::builder()
            .add_source(config::File::from_str(json, config::FileFormat::Json))
            .build()
            .expect("build");
        config.try_deserialize().expect("deserialize")
    }
}
