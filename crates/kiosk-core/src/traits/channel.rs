//! Push channel contract and the per-session channel handle.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::result::AppResult;
use crate::types::{SessionId, TelemetryEvent};

/// What a channel is opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subscription {
    /// Queue admission notifications while waiting.
    Queue,
    /// Device telemetry while admitted.
    Telemetry,
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subscription::Queue => write!(f, "queue"),
            Subscription::Telemetry => write!(f, "telemetry"),
        }
    }
}

/// Signals delivered by an open channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSignal {
    /// Transport is (re)connecting.
    Connecting,
    /// Transport is up.
    Connected,
    /// Transport dropped; the channel keeps trying to reconnect.
    Disconnected {
        /// Human-readable cause.
        reason: String,
    },
    /// `queueUpdate` push.
    QueueUpdate {
        /// Session the update is addressed to.
        session_id: SessionId,
        /// Whether that session may proceed.
        can_proceed: bool,
    },
    /// One metric from a `healthData` push.
    Telemetry(TelemetryEvent),
}

/// Owned handle to one open channel.
///
/// Scoped to a single session: dropping or closing the handle stops the
/// transport task behind it.
#[derive(Debug)]
pub struct ChannelHandle {
    session_id: SessionId,
    subscription: Subscription,
    signals: mpsc::Receiver<ChannelSignal>,
    cancel: CancellationToken,
}

impl ChannelHandle {
    /// Wrap the receiving half of a transport task.
    pub fn new(
        session_id: SessionId,
        subscription: Subscription,
        signals: mpsc::Receiver<ChannelSignal>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            subscription,
            signals,
            cancel,
        }
    }

    /// Session this channel belongs to.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// What the channel was opened for.
    pub fn subscription(&self) -> Subscription {
        self.subscription
    }

    /// Next signal, or `None` once the transport task is gone.
    pub async fn recv(&mut self) -> Option<ChannelSignal> {
        self.signals.recv().await
    }

    /// Stop the transport task. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Opens session-scoped push channels.
#[async_trait]
pub trait PushChannel: Send + Sync + std::fmt::Debug + 'static {
    /// Open a channel for `session_id`. Returns immediately; connection
    /// progress is reported through [`ChannelSignal`]s.
    async fn open(
        &self,
        session_id: &SessionId,
        subscription: Subscription,
    ) -> AppResult<ChannelHandle>;
}
