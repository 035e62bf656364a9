//! Normalisation of `healthData` payloads.
//!
//! The device pushes either a partial object
//! (`{"heartRate": 72, "SpO2": null, "timestamp": ...}`) or one tagged
//! metric (`{"metric": "weight", "value": 68}`). Both become a list of
//! per-metric [`TelemetryEvent`]s.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use kiosk_core::types::{Metric, SessionId, TelemetryEvent};

/// Raw `healthData` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthPayload {
    /// Session tag, when the device knows it.
    #[serde(default, alias = "sessionId")]
    pub user_id: Option<SessionId>,
    /// Heart rate in bpm.
    #[serde(default)]
    pub heart_rate: Option<f64>,
    /// Blood oxygen saturation.
    #[serde(default, rename = "SpO2", alias = "spo2")]
    pub spo2: Option<f64>,
    /// Weight in kg.
    #[serde(default)]
    pub weight: Option<f64>,
    /// Single-metric form: which metric.
    #[serde(default)]
    pub metric: Option<Metric>,
    /// Single-metric form: its value.
    #[serde(default)]
    pub value: Option<f64>,
    /// Device timestamp.
    #[serde(default)]
    pub timestamp: Option<WireTimestamp>,
}

/// Timestamp as the device sends it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    /// Unix epoch, in milliseconds when large enough, else seconds.
    Epoch(f64),
    /// RFC 3339 text.
    Text(String),
}

// Anything above this is taken as milliseconds (year 5138 in seconds).
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

impl WireTimestamp {
    /// Parse into UTC; `None` when the value is not a usable time.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            WireTimestamp::Epoch(raw) if raw.is_finite() && *raw >= 0.0 => {
                let millis = if *raw >= EPOCH_MILLIS_THRESHOLD {
                    *raw
                } else {
                    *raw * 1000.0
                };
                Utc.timestamp_millis_opt(millis as i64).single()
            }
            WireTimestamp::Epoch(_) => None,
            WireTimestamp::Text(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

impl HealthPayload {
    /// Split into per-metric events. Missing or unparsable timestamps are
    /// stamped with `received_at`.
    pub fn into_events(self, received_at: DateTime<Utc>) -> Vec<TelemetryEvent> {
        let timestamp = self
            .timestamp
            .as_ref()
            .and_then(WireTimestamp::to_utc)
            .unwrap_or(received_at);

        let mut values: Vec<(Metric, f64)> = Vec::with_capacity(3);
        if let (Some(metric), Some(value)) = (self.metric, self.value) {
            values.push((metric, value));
        }
        for (metric, value) in [
            (Metric::HeartRate, self.heart_rate),
            (Metric::Spo2, self.spo2),
            (Metric::Weight, self.weight),
        ] {
            if let Some(value) = value {
                if !values.iter().any(|(m, _)| *m == metric) {
                    values.push((metric, value));
                }
            }
        }

        values
            .into_iter()
            .map(|(metric, value)| TelemetryEvent {
                session_id: self.user_id.clone(),
                metric,
                value,
                timestamp,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> HealthPayload {
        serde_json::from_str(json).expect("payload")
    }

    #[test]
    fn test_partial_object_skips_nulls() {
        let now = Utc::now();
        let events = parse(r#"{"heartRate": 72, "SpO2": null}"#).into_events(now);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].metric, Metric::HeartRate);
        assert_eq!(events[0].value, 72.0);
        assert_eq!(events[0].timestamp, now);
        assert_eq!(events[0].session_id, None);
    }

    #[test]
    fn test_full_object_with_tag_and_epoch_millis() {
        let events = parse(
            r#"{"userId":"u-1","heartRate":72,"SpO2":97,"weight":68.4,"timestamp":1700000000000}"#,
        )
        .into_events(Utc::now());
        assert_eq!(events.len(), 3);
        let expected = Utc.timestamp_millis_opt(1_700_000_000_000).single();
        assert!(events.iter().all(|e| Some(e.timestamp) == expected));
        assert!(
            events
                .iter()
                .all(|e| e.session_id == Some(SessionId::from("u-1")))
        );
    }

    #[test]
    fn test_single_metric_form() {
        let events = parse(r#"{"metric":"spo2","value":97,"timestamp":"2024-05-01T10:00:00Z"}"#)
            .into_events(Utc::now());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].metric, Metric::Spo2);
        assert_eq!(events[0].timestamp.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_epoch_seconds() {
        let ts = WireTimestamp::Epoch(1_700_000_000.0).to_utc().expect("seconds");
        assert_eq!(ts.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_bad_timestamp_falls_back_to_receive_time() {
        let now = Utc::now();
        let events = parse(r#"{"weight": 70, "timestamp": "yesterday"}"#).into_events(now);
        assert_eq!(events[0].timestamp, now);
    }
}
