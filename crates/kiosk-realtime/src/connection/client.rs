//! WebSocket [`PushChannel`] implementation.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use kiosk_core::config::TelemetryConfig;
use kiosk_core::result::AppResult;
use kiosk_core::traits::{ChannelHandle, PushChannel, Subscription};
use kiosk_core::types::SessionId;

use super::transport::TransportLink;

/// Opens one reconnecting WebSocket per channel.
#[derive(Debug, Clone)]
pub struct WsPushChannel {
    config: TelemetryConfig,
}

impl WsPushChannel {
    /// Create a channel factory for the configured endpoint.
    pub fn new(config: TelemetryConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PushChannel for WsPushChannel {
    async fn open(
        &self,
        session_id: &SessionId,
        subscription: Subscription,
    ) -> AppResult<ChannelHandle> {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        let cancel = CancellationToken::new();

        let link = TransportLink {
            config: self.config.clone(),
            session_id: session_id.clone(),
            subscription,
            signals: tx,
            cancel: cancel.clone(),
        };
        tokio::spawn(link.run());

        Ok(ChannelHandle::new(session_id.clone(), subscription, rx, cancel))
    }
}
