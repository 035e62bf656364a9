//! HTTP registry client.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use kiosk_core::config::RegistryConfig;
use kiosk_core::error::{AppError, ErrorKind};
use kiosk_core::result::AppResult;
use kiosk_core::traits::RegistryClient;
use kiosk_core::types::{AdmissionStatus, Profile, ReadingSubmission, SessionId};

use crate::envelope::{Envelope, RegisterData, StatusClass, classify, error_message};

/// Body shared by the queue endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserRef<'a> {
    user_id: &'a SessionId,
}

/// `reqwest`-backed [`RegistryClient`].
#[derive(Debug, Clone)]
pub struct HttpRegistryClient {
    /// Shared connection pool.
    client: reqwest::Client,
    /// Base URL and credentials.
    config: RegistryConfig,
}

impl HttpRegistryClient {
    /// Build a client with the configured timeout and bearer token.
    pub fn new(config: &RegistryConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                AppError::configuration(format!("registry.api_key is not a valid header: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::internal(format!("Registry HTTP client init failed: {e}")))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// POST `body` to `path` and decode the envelope.
    ///
    /// Transport failures and 5xx map to `Network`; 4xx map to `reject_kind`.
    async fn post<B, T>(
        &self,
        path: &str,
        body: &B,
        reject_kind: ErrorKind,
    ) -> AppResult<Envelope<T>>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Network, format!("POST {path}: {e}"), e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Network, format!("POST {path}: {e}"), e))?;
        debug!(path = %path, status = %status, "Registry response");

        match classify(status) {
            StatusClass::Ok => {}
            StatusClass::Rejected => {
                let detail = error_message(&text).unwrap_or_else(|| status.to_string());
                return Err(AppError::new(reject_kind, detail));
            }
            StatusClass::Unavailable => {
                let detail = error_message(&text).unwrap_or_else(|| status.to_string());
                return Err(AppError::network(format!("POST {path}: {detail}")));
            }
        }

        if text.trim().is_empty() {
            return Ok(Envelope {
                success: true,
                data: None,
                message: None,
            });
        }
        serde_json::from_str(&text).map_err(AppError::from)
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    #[instrument(skip(self, profile), fields(email = %profile.email))]
    async fn register(&self, profile: &Profile) -> AppResult<SessionId> {
        let envelope: Envelope<RegisterData> = self
            .post("users/register", profile, ErrorKind::Validation)
            .await?;
        envelope
            .into_data(AppError::validation)
            .map(|data| data.user_id)
    }

    #[instrument(skip(self), fields(session_id = %session_id))]
    async fn queue_status(&self, session_id: &SessionId) -> AppResult<AdmissionStatus> {
        let envelope: Envelope<AdmissionStatus> = self
            .post("queue/status", &UserRef { user_id: session_id }, ErrorKind::Network)
            .await?;
        envelope.into_data(AppError::network)
    }

    #[instrument(skip(self), fields(session_id = %session_id))]
    async fn complete(&self, session_id: &SessionId) -> AppResult<()> {
        let envelope: Envelope<serde_json::Value> = self
            .post("queue/complete", &UserRef { user_id: session_id }, ErrorKind::Network)
            .await?;
        envelope.ensure_success(AppError::network)
    }

    #[instrument(skip(self), fields(session_id = %session_id))]
    async fn leave(&self, session_id: &SessionId) -> AppResult<()> {
        let envelope: Envelope<serde_json::Value> = self
            .post("queue/leave", &UserRef { user_id: session_id }, ErrorKind::Network)
            .await?;
        envelope.ensure_success(AppError::network)
    }

    #[instrument(skip(self, submission), fields(session_id = %submission.session_id))]
    async fn submit_readings(&self, submission: &ReadingSubmission) -> AppResult<()> {
        let envelope: Envelope<serde_json::Value> = self
            .post("users", submission, ErrorKind::CommitFailed)
            .await?;
        envelope.ensure_success(AppError::commit_failed)
    }
}
