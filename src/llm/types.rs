//! LLM types: provider-neutral request/response types and errors.
//!
//! Shared by the Gemini and `OpenAI` clients. A request is always a single
//! user turn carrying one image, one block of text, and a JSON schema the
//! answer must follow.

use crate::error::ErrorCode;
use crate::payload::ImagePayload;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The required API key environment variable is not set or blank.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the LLM provider failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The LLM provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The LLM provider response envelope could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The provider refused the prompt and produced no candidates.
    #[error("prompt blocked: {0}")]
    Blocked(String),

    /// The provider answered successfully but with no output text.
    #[error("no response text received")]
    EmptyOutput,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for LlmError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::Blocked(_) => "E_BLOCKED",
            Self::EmptyOutput => "E_EMPTY_OUTPUT",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::ApiRequest(_) | Self::ApiResponse { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

/// One multimodal, schema-constrained generation request.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    /// Short system-level instruction.
    pub system: String,
    /// Task instructions followed by the knowledge section.
    pub prompt: String,
    /// The single image under analysis.
    pub image: ImagePayload,
    /// JSON schema the output text must conform to.
    pub response_schema: serde_json::Value,
}

/// Raw output of a generation call, before any schema validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionResponse {
    /// Model output text; never blank.
    pub text: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

// =============================================================================
// VISION CHAT TRAIT
// =============================================================================

/// Provider-neutral async trait for one-shot vision calls. Enables mocking in tests.
#[async_trait::async_trait]
pub trait VisionChat: Send + Sync {
    /// Send a single request to the provider. Implementations make exactly
    /// one HTTP call and never retry.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the request fails, the response envelope is
    /// malformed, or the output text is empty.
    async fn generate(&self, request: &VisionRequest) -> Result<VisionResponse, LlmError>;
}

/// Returns `text` if it has non-whitespace content.
pub(crate) fn non_blank(text: String) -> Result<String, LlmError> {
    if text.trim().is_empty() { Err(LlmError::EmptyOutput) } else { Ok(text) }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
