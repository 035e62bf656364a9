//! Biometric metrics, per-metric telemetry events, and the commit payload.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::SessionId;

/// The three metrics a complete reading set is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Heart rate in beats per minute.
    #[serde(rename = "heartRate")]
    HeartRate,
    /// Blood oxygen saturation in percent.
    #[serde(rename = "spo2", alias = "SpO2")]
    Spo2,
    /// Body weight in kilograms.
    #[serde(rename = "weight")]
    Weight,
}

impl Metric {
    /// All metrics, in display order.
    pub const ALL: [Metric; 3] = [Metric::HeartRate, Metric::Spo2, Metric::Weight];
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::HeartRate => write!(f, "heartRate"),
            Metric::Spo2 => write!(f, "spo2"),
            Metric::Weight => write!(f, "weight"),
        }
    }
}

/// One metric value pushed by the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Session the device tagged the reading with, if any.
    pub session_id: Option<SessionId>,
    /// Which metric.
    pub metric: Metric,
    /// The measured value.
    pub value: f64,
    /// When the device took the reading.
    pub timestamp: DateTime<Utc>,
}

impl TelemetryEvent {
    /// A value the sensor reports before it has a measurement (zero,
    /// negative, NaN) is not a reading.
    pub fn is_plausible(&self) -> bool {
        self.value.is_finite() && self.value > 0.0
    }
}

/// Body of `POST users`, the idempotent-by-session commit endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingSubmission {
    /// Heart rate in bpm.
    #[serde(rename = "heartRate")]
    pub heart_rate: f64,
    /// Blood oxygen saturation.
    #[serde(rename = "SpO2")]
    pub spo2: f64,
    /// Weight in kg.
    pub weight: f64,
    /// Session the readings belong to.
    #[serde(rename = "userId")]
    pub session_id: SessionId,
}
