//! Public entry points: the kiosk and a handle to one running visit.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::info;

use kiosk_core::config::AppConfig;
use kiosk_core::error::AppError;
use kiosk_core::events::KioskEvent;
use kiosk_core::result::AppResult;
use kiosk_core::traits::{PushChannel, RegistryClient};
use kiosk_core::types::{Profile, SessionId};

use crate::admission::AdmissionClient;
use crate::driver::{Command, Driver, DriverContext};
use crate::view::SessionView;

pub use crate::driver::VisitOutcome;

const COMMAND_BUFFER: usize = 16;
const EVENT_BUFFER: usize = 64;

/// A kiosk station: registers visitors and runs their visits.
#[derive(Debug, Clone)]
pub struct Kiosk {
    config: AppConfig,
    registry: Arc<dyn RegistryClient>,
    channels: Arc<dyn PushChannel>,
    admission: AdmissionClient,
    events: broadcast::Sender<KioskEvent>,
}

impl Kiosk {
    /// Create a kiosk over the given collaborators.
    pub fn new(
        config: AppConfig,
        registry: Arc<dyn RegistryClient>,
        channels: Arc<dyn PushChannel>,
    ) -> Self {
        let admission = AdmissionClient::new(Arc::clone(&registry), config.admission.clone());
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            config,
            registry,
            channels,
            admission,
            events,
        }
    }

    /// Events from every visit on this kiosk.
    pub fn subscribe(&self) -> broadcast::Receiver<KioskEvent> {
        self.events.subscribe()
    }

    /// Register `profile` and start watching the queue.
    ///
    /// On failure no visit exists and the error is returned as-is.
    pub async fn start_visit(&self, profile: &Profile) -> AppResult<VisitHandle> {
        let session_id = self.admission.register(profile).await?;

        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (view_tx, view_rx) = watch::channel(SessionView::queued(session_id.clone()));
        let driver = Driver::new(
            session_id.clone(),
            DriverContext {
                config: self.config.clone(),
                registry: Arc::clone(&self.registry),
                channels: Arc::clone(&self.channels),
                commands: commands_rx,
                events: self.events.clone(),
                view: view_tx,
            },
        );
        let task = tokio::spawn(driver.run());
        info!(session_id = %session_id, "Visit queued");

        Ok(VisitHandle {
            session_id,
            commands: commands_tx,
            view: view_rx,
            events: self.events.clone(),
            task,
        })
    }
}

/// Control surface of one running visit.
///
/// Dropping the handle shuts the visit down.
#[derive(Debug)]
pub struct VisitHandle {
    session_id: SessionId,
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<SessionView>,
    events: broadcast::Sender<KioskEvent>,
    task: JoinHandle<VisitOutcome>,
}

impl VisitHandle {
    /// The registry's id for this visit.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Latest view.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// A receiver that sees every published view.
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Events from this kiosk, starting now.
    pub fn subscribe(&self) -> broadcast::Receiver<KioskEvent> {
        self.events.subscribe()
    }

    /// Resubmit the frozen readings after a failed commit.
    pub async fn retry(&self) -> AppResult<()> {
        self.ask(Command::Retry).await
    }

    /// Discard the failed readings and capture fresh ones.
    pub async fn cancel(&self) -> AppResult<()> {
        self.ask(Command::Cancel).await
    }

    /// Leave the queue or the device. No-op once released.
    pub async fn leave(&self) {
        let _ = self.commands.send(Command::Leave).await;
    }

    /// Reset for the next visitor. No-op once released.
    pub async fn reset(&self) {
        let _ = self.commands.send(Command::Reset).await;
    }

    /// Stop the visit because the station is going down.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }

    /// Resolves once the visit is released.
    pub async fn released(&self) {
        let mut view = self.view.clone();
        let _ = view.wait_for(|v| v.state.is_terminal()).await;
    }

    /// Wait for the visit to end.
    pub async fn finished(self) -> AppResult<VisitOutcome> {
        self.task
            .await
            .map_err(|e| AppError::internal(format!("visit task failed: {e}")))
    }

    async fn ask(
        &self,
        command: impl FnOnce(oneshot::Sender<AppResult<()>>) -> Command,
    ) -> AppResult<()> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| AppError::invalid_state("visit is over"))?;
        rx.await
            .map_err(|_| AppError::invalid_state("visit is over"))?
    }
}
