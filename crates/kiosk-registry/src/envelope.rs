//! The registry's response envelope and status classification.

use reqwest::StatusCode;
use serde::Deserialize;

use kiosk_core::error::AppError;

/// `{success, data, message}` wrapper around every registry response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// Whether the registry accepted the request.
    #[serde(default = "default_success")]
    pub success: bool,
    /// Payload on success.
    pub data: Option<T>,
    /// Human-readable failure (or status) message.
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Payload of a successful envelope, or the error built by `reject`.
    pub fn into_data(self, reject: impl FnOnce(String) -> AppError) -> Result<T, AppError> {
        if !self.success {
            return Err(reject(
                self.message
                    .unwrap_or_else(|| "request rejected by registry".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| reject("registry response carried no data".to_string()))
    }

    /// Accept or reject an envelope whose payload is irrelevant.
    pub fn ensure_success(self, reject: impl FnOnce(String) -> AppError) -> Result<(), AppError> {
        if self.success {
            Ok(())
        } else {
            Err(reject(
                self.message
                    .unwrap_or_else(|| "request rejected by registry".to_string()),
            ))
        }
    }
}

// Endpoints that answer with an empty body still count as successful.
fn default_success() -> bool {
    true
}

/// Payload of a successful registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterData {
    /// Identifier of the new visit.
    pub user_id: kiosk_core::types::SessionId,
}

/// How a non-2xx status should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Request accepted.
    Ok,
    /// Request rejected because of its content.
    Rejected,
    /// Server-side or gateway failure.
    Unavailable,
}

/// Classify an HTTP status.
pub fn classify(status: StatusCode) -> StatusClass {
    if status.is_success() {
        StatusClass::Ok
    } else if status.is_client_error()
        && status != StatusCode::REQUEST_TIMEOUT
        && status != StatusCode::TOO_MANY_REQUESTS
    {
        StatusClass::Rejected
    } else {
        StatusClass::Unavailable
    }
}

/// Pull a message out of an error body, if it has one.
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Envelope<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.message)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty() && trimmed.len() <= 200).then(|| trimmed.to_string())
        })
}
