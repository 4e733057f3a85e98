//! Analysis: one image plus a knowledge excerpt in, one validated plan out.
//!
//! DESIGN
//! ======
//! `analyze` resolves provider configuration at call time, so a missing
//! credential fails before any client or socket exists. `analyze_with`
//! takes any [`VisionChat`] and is where composition, the single backend
//! call, and validation happen. No retries, no caching.

pub mod prompt;
pub mod types;

use tracing::{info, warn};

use crate::error::AssistError;
use crate::llm::types::VisionChat;
use crate::llm::{LlmClient, config::LlmConfig};
use crate::payload::ImagePayload;
pub use types::{ActionStep, EngineeringResponse, Priority, VisualSummary};

/// Analyze `image` against `knowledge` using the provider configured in the
/// environment.
///
/// # Errors
///
/// [`AssistError::Configuration`] when the credential is missing (no network
/// access is attempted), [`AssistError::Backend`] on transport failure, and
/// [`AssistError::ResponseFormat`] on empty or non-conforming output.
pub async fn analyze(image: &ImagePayload, knowledge: &str) -> Result<EngineeringResponse, AssistError> {
    let config = LlmConfig::from_env()?;
    let client = LlmClient::from_config(config)?;
    info!(model = client.model(), "LLM client initialized");
    analyze_with(&client, image, knowledge).await
}

/// Analyze with an explicit backend.
///
/// # Errors
///
/// See [`analyze`].
pub async fn analyze_with(
    client: &dyn VisionChat,
    image: &ImagePayload,
    knowledge: &str,
) -> Result<EngineeringResponse, AssistError> {
    let request = prompt::compose(image, knowledge);
    info!(
        image = %image.name,
        media_type = %image.media_type,
        image_bytes = image.bytes.len(),
        knowledge_chars = knowledge.chars().count(),
        "analysis started"
    );

    let output = client.generate(&request).await.map_err(|e| {
        warn!(error = %e, "backend call failed");
        AssistError::from(e)
    })?;

    let response = EngineeringResponse::from_json(&output.text)?;
    info!(
        steps = response.action_steps.len(),
        questions = response.open_questions.len(),
        "analysis complete"
    );
    Ok(response)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
