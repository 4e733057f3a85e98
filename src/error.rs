//! Error taxonomy for a single analysis or capture attempt.
//!
//! DESIGN
//! ======
//! Every failure that can reach the user is one of four kinds. Transport
//! errors from the LLM adapter and camera errors from the capture flow are
//! classified into these at the module boundary, so callers only ever
//! match on [`AssistError`].

use crate::capture::CameraError;
use crate::llm::types::LlmError;

/// Generic notice shown when the failure detail is not meant for the user.
pub const GENERIC_FAILURE_MESSAGE: &str = "Falha na análise. Verifique a API Key e tente novamente.";

/// Notice shown when the camera cannot be opened.
pub const CAMERA_PERMISSION_MESSAGE: &str =
    "Erro ao acessar a câmera. Verifique as permissões e tente novamente.";

/// Stable machine-readable classification for errors.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// ASSIST ERROR
// =============================================================================

/// The four failure kinds surfaced by analysis and capture.
#[derive(Debug, thiserror::Error)]
pub enum AssistError {
    /// The credential is missing or the provider settings are invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Camera access was denied or no camera is available.
    #[error("camera permission error: {0}")]
    Permission(String),

    /// The backend call failed in transport, auth, or quota.
    #[error("{0}")]
    Backend(String),

    /// The backend answered with an empty or non-conforming body.
    #[error("response format error: {0}")]
    ResponseFormat(String),
}

impl AssistError {
    /// The single string shown to the user for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(message) if !message.trim().is_empty() => message.clone(),
            Self::Permission(_) => CAMERA_PERMISSION_MESSAGE.to_string(),
            Self::Configuration(_) | Self::Backend(_) | Self::ResponseFormat(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }
}

impl ErrorCode for AssistError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "E_CONFIGURATION",
            Self::Permission(_) => "E_PERMISSION",
            Self::Backend(_) => "E_BACKEND",
            Self::ResponseFormat(_) => "E_RESPONSE_FORMAT",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

impl From<LlmError> for AssistError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::ConfigParse(_) | LlmError::MissingApiKey { .. } => Self::Configuration(err.to_string()),
            LlmError::ApiRequest(message) | LlmError::HttpClientBuild(message) => Self::Backend(message),
            LlmError::ApiResponse { status, ref body } => {
                Self::Backend(format!("{} (HTTP {status})", provider_error_message(body)))
            }
            LlmError::Blocked(reason) => Self::Backend(format!("request blocked by provider: {reason}")),
            LlmError::ApiParse(_) | LlmError::EmptyOutput => Self::ResponseFormat(err.to_string()),
        }
    }
}

impl From<CameraError> for AssistError {
    fn from(err: CameraError) -> Self {
        Self::Permission(err.to_string())
    }
}

/// Best-effort extraction of `error.message` from a provider error body.
fn provider_error_message(body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body).map_or(None, |json| {
        json.get("error")
            .and_then(|e| e.get("message"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
    });
    match message {
        Some(message) => message,
        None if body.trim().is_empty() => "backend returned an error".to_string(),
        None => body.trim().chars().take(300).collect(),
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
