//! Reconnecting WebSocket transport task.
//!
//! One task per open channel. It connects, subscribes on behalf of the
//! session, forwards decoded signals, and on any drop reports
//! `Disconnected` and reconnects with exponential backoff until the
//! channel handle is closed.

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use kiosk_core::config::TelemetryConfig;
use kiosk_core::traits::{ChannelSignal, Subscription};
use kiosk_core::types::SessionId;

use super::backoff::Backoff;
use crate::message::serializer::{Decoded, decode_frame, serialize_outbound};
use crate::message::types::OutboundMessage;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a connected socket stopped being pumped.
#[derive(Debug)]
enum PumpExit {
    /// The handle was closed.
    Cancelled,
    /// The session stopped listening.
    ReceiverGone,
    /// The transport dropped.
    Dropped(String),
}

/// Everything one transport task needs.
#[derive(Debug)]
pub struct TransportLink {
    /// Endpoint and timing settings.
    pub config: TelemetryConfig,
    /// Session the channel is scoped to.
    pub session_id: SessionId,
    /// What to subscribe to.
    pub subscription: Subscription,
    /// Signal sink read by the session.
    pub signals: mpsc::Sender<ChannelSignal>,
    /// Fired when the handle is closed or dropped.
    pub cancel: CancellationToken,
}

impl TransportLink {
    /// Run until the handle is closed or the session stops listening.
    pub async fn run(self) {
        let mut backoff = Backoff::new(
            self.config.reconnect_initial_delay(),
            self.config.reconnect_max_delay(),
        );

        loop {
            if self.cancel.is_cancelled() || !self.emit(ChannelSignal::Connecting).await {
                break;
            }

            let connected = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = connect_async(self.config.ws_url.as_str()) => result,
            };

            let reason = match connected {
                Ok((socket, _)) => {
                    info!(
                        session_id = %self.session_id,
                        subscription = %self.subscription,
                        "Push channel connected"
                    );
                    backoff.reset();
                    if !self.emit(ChannelSignal::Connected).await {
                        break;
                    }
                    match self.pump(socket).await {
                        PumpExit::Cancelled | PumpExit::ReceiverGone => break,
                        PumpExit::Dropped(reason) => reason,
                    }
                }
                Err(e) => format!("connect failed: {e}"),
            };

            warn!(
                session_id = %self.session_id,
                subscription = %self.subscription,
                reason = %reason,
                "Push channel dropped"
            );
            if !self.emit(ChannelSignal::Disconnected { reason }).await {
                break;
            }

            let delay = backoff.next_delay();
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        debug!(
            session_id = %self.session_id,
            subscription = %self.subscription,
            "Push channel transport ended"
        );
    }

    /// Forward one signal. Returns `false` once the session is gone.
    async fn emit(&self, signal: ChannelSignal) -> bool {
        self.signals.send(signal).await.is_ok()
    }

    /// Whether this subscription carries the given signal.
    fn wants(&self, signal: &ChannelSignal) -> bool {
        match signal {
            ChannelSignal::QueueUpdate { .. } => self.subscription == Subscription::Queue,
            ChannelSignal::Telemetry(_) => self.subscription == Subscription::Telemetry,
            _ => true,
        }
    }

    async fn pump(&self, socket: Socket) -> PumpExit {
        let (mut sink, mut stream) = socket.split();

        let subscribe = OutboundMessage::Subscribe {
            channel: self.subscription.to_string(),
            user_id: self.session_id.clone(),
        };
        let text = match serialize_outbound(&subscribe) {
            Ok(text) => text,
            Err(e) => return PumpExit::Dropped(format!("subscribe encode failed: {e}")),
        };
        if let Err(e) = sink.send(Message::Text(text.into())).await {
            return PumpExit::Dropped(format!("subscribe failed: {e}"));
        }

        let idle = self.config.idle_timeout();
        loop {
            let frame = tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return PumpExit::Cancelled;
                }
                frame = tokio::time::timeout(idle, stream.next()) => frame,
            };

            let message = match frame {
                Err(_) => return PumpExit::Dropped(format!("no frame for {}s", idle.as_secs())),
                Ok(None) => return PumpExit::Dropped("stream ended".to_string()),
                Ok(Some(Err(e))) => return PumpExit::Dropped(e.to_string()),
                Ok(Some(Ok(message))) => message,
            };

            match message {
                Message::Text(text) => match decode_frame(text.as_str(), Utc::now()) {
                    Ok(Decoded::Signals(signals)) => {
                        for signal in signals.into_iter().filter(|s| self.wants(s)) {
                            if !self.emit(signal).await {
                                return PumpExit::ReceiverGone;
                            }
                        }
                    }
                    Ok(Decoded::Reply(reply)) => {
                        if let Err(e) = sink.send(Message::Text(reply.into())).await {
                            return PumpExit::Dropped(format!("reply failed: {e}"));
                        }
                    }
                    Ok(Decoded::Ignore) => {}
                    Err(e) => {
                        debug!(session_id = %self.session_id, error = %e, "Undecodable frame dropped");
                    }
                },
                Message::Close(frame) => {
                    return PumpExit::Dropped(format!("closed by server: {frame:?}"));
                }
                _ => {}
            }
        }
    }
}
