//! Last-writer-wins reading set.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use kiosk_core::types::{Metric, ReadingSubmission, SessionId, TelemetryEvent};

/// One accepted metric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    /// Measured value.
    pub value: f64,
    /// Device timestamp of the value.
    pub at: DateTime<Utc>,
}

/// What [`ReadingSet::apply`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The event replaced (or filled) the metric.
    Applied,
    /// The event is older than the stored value.
    Stale,
    /// The event repeats the stored value at the same timestamp.
    Duplicate,
}

/// The latest value per metric for the current capture cycle.
#[derive(Debug, Clone, Default)]
pub struct ReadingSet {
    values: HashMap<Metric, Reading>,
    last_updated: Option<DateTime<Utc>>,
}

impl ReadingSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one event. Newer or equal timestamps win; an exact repeat is
    /// reported as a duplicate so replays are harmless.
    pub fn apply(&mut self, event: &TelemetryEvent) -> ApplyOutcome {
        if let Some(current) = self.values.get(&event.metric) {
            if event.timestamp < current.at {
                return ApplyOutcome::Stale;
            }
            if event.timestamp == current.at && event.value == current.value {
                return ApplyOutcome::Duplicate;
            }
        }

        self.values.insert(
            event.metric,
            Reading {
                value: event.value,
                at: event.timestamp,
            },
        );
        self.last_updated = Some(match self.last_updated {
            Some(prev) => prev.max(event.timestamp),
            None => event.timestamp,
        });
        ApplyOutcome::Applied
    }

    /// Value for one metric.
    pub fn get(&self, metric: Metric) -> Option<Reading> {
        self.values.get(&metric).copied()
    }

    /// Latest device timestamp across all metrics.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// All three metrics present.
    pub fn is_complete(&self) -> bool {
        Metric::ALL.iter().all(|m| self.values.contains_key(m))
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Freeze the current values. `None` until complete.
    pub fn snapshot(&self) -> Option<ReadingSnapshot> {
        Some(ReadingSnapshot {
            heart_rate: self.get(Metric::HeartRate)?.value,
            spo2: self.get(Metric::Spo2)?.value,
            weight: self.get(Metric::Weight)?.value,
            taken_at: self.last_updated?,
        })
    }

    /// Drop every value.
    pub fn clear(&mut self) {
        self.values.clear();
        self.last_updated = None;
    }
}

/// An immutable copy of a complete reading set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSnapshot {
    /// Heart rate in bpm.
    pub heart_rate: f64,
    /// Blood oxygen saturation.
    pub spo2: f64,
    /// Weight in kg.
    pub weight: f64,
    /// Latest device timestamp in the set.
    pub taken_at: DateTime<Utc>,
}

impl ReadingSnapshot {
    /// Registry payload for this snapshot.
    pub fn to_submission(&self, session_id: &SessionId) -> ReadingSubmission {
        ReadingSubmission {
            heart_rate: self.heart_rate,
            spo2: self.spo2,
            weight: self.weight,
            session_id: session_id.clone(),
        }
    }
}
