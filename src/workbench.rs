//! Workbench: the input surface: one image, one knowledge text, one result.
//!
//! DESIGN
//! ======
//! All analysis failures end here as a single error message; nothing else
//! in the workbench changes on failure, so the selected image survives.
//! Every submission is stamped with a generation. Replacing the image or
//! resetting bumps the generation, and `finish` drops outcomes whose stamp
//! no longer matches. The backend call itself is never cancelled, so at
//! most one submission is in flight: until its outcome arrives (or it is
//! abandoned) the bench stays `Analyzing` and refuses new submissions, even
//! if the inputs changed meanwhile.

use tracing::{debug, info};

use crate::analysis::{self, EngineeringResponse};
use crate::error::{AssistError, ErrorCode};
use crate::llm::types::VisionChat;
use crate::payload::ImagePayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingState {
    Idle,
    Analyzing,
    Success,
    Error,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("an analysis is already running")]
    Busy,

    #[error("no image selected")]
    NoImage,
}

/// One accepted submission: what to analyze and which generation it
/// belongs to.
#[derive(Debug, Clone)]
pub struct Submission {
    generation: u64,
    image: ImagePayload,
    knowledge: String,
}

impl Submission {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn image(&self) -> &ImagePayload {
        &self.image
    }

    #[must_use]
    pub fn knowledge(&self) -> &str {
        &self.knowledge
    }
}

#[derive(Debug)]
pub struct Workbench {
    image: Option<ImagePayload>,
    knowledge: String,
    state: LoadingState,
    result: Option<EngineeringResponse>,
    error: Option<String>,
    generation: u64,
    /// Generation of the outstanding submission.
    in_flight: Option<u64>,
}

impl Default for Workbench {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbench {
    #[must_use]
    pub fn new() -> Self {
        Self::with_knowledge(String::new())
    }

    #[must_use]
    pub fn with_knowledge(knowledge: impl Into<String>) -> Self {
        Self {
            image: None,
            knowledge: knowledge.into(),
            state: LoadingState::Idle,
            result: None,
            error: None,
            generation: 0,
            in_flight: None,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn image(&self) -> Option<&ImagePayload> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn knowledge(&self) -> &str {
        &self.knowledge
    }

    #[must_use]
    pub fn state(&self) -> LoadingState {
        self.state
    }

    #[must_use]
    pub fn result(&self) -> Option<&EngineeringResponse> {
        self.result.as_ref()
    }

    /// User-facing message of the last failure.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `submit` would currently be accepted.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.image.is_some() && self.in_flight.is_none()
    }

    // -------------------------------------------------------------------------
    // Inputs
    // -------------------------------------------------------------------------

    /// Replace the image with a file the user picked.
    pub fn select_image(&mut self, image: ImagePayload) {
        debug!(name = %image.name, bytes = image.bytes.len(), "image selected");
        self.replace_image(Some(image));
    }

    /// Replace the image with a camera still.
    pub fn accept_capture(&mut self, image: ImagePayload) {
        debug!(bytes = image.bytes.len(), "camera capture accepted");
        self.replace_image(Some(image));
    }

    pub fn remove_image(&mut self) {
        self.replace_image(None);
    }

    pub fn set_knowledge(&mut self, knowledge: impl Into<String>) {
        self.knowledge = knowledge.into();
    }

    pub fn clear_knowledge(&mut self) {
        self.knowledge.clear();
    }

    fn replace_image(&mut self, image: Option<ImagePayload>) {
        self.image = image;
        self.result = None;
        self.error = None;
        self.state = if self.in_flight.is_some() { LoadingState::Analyzing } else { LoadingState::Idle };
        self.generation += 1;
    }

    // -------------------------------------------------------------------------
    // Analysis lifecycle
    // -------------------------------------------------------------------------

    /// Start an analysis of the current image and knowledge.
    ///
    /// # Errors
    ///
    /// [`SubmitError::Busy`] while an analysis is outstanding,
    /// [`SubmitError::NoImage`] when nothing is selected.
    pub fn submit(&mut self) -> Result<Submission, SubmitError> {
        if self.in_flight.is_some() {
            return Err(SubmitError::Busy);
        }
        let image = self.image.clone().ok_or(SubmitError::NoImage)?;

        self.state = LoadingState::Analyzing;
        self.error = None;
        self.in_flight = Some(self.generation);
        Ok(Submission { generation: self.generation, image, knowledge: self.knowledge.clone() })
    }

    /// Apply the outcome of `submission`. Returns `false` when the
    /// submission is stale and the outcome was discarded.
    pub fn finish(&mut self, submission: &Submission, outcome: Result<EngineeringResponse, AssistError>) -> bool {
        if !self.release(submission.generation) {
            debug!(submitted = submission.generation, "outcome for a submission that is not outstanding");
            return false;
        }
        if submission.generation != self.generation {
            debug!(
                submitted = submission.generation,
                current = self.generation,
                "discarding stale analysis result"
            );
            return false;
        }

        match outcome {
            Ok(response) => {
                info!(steps = response.action_steps.len(), "analysis result shown");
                self.result = Some(response);
                self.error = None;
                self.state = LoadingState::Success;
            }
            Err(err) => {
                info!(code = err.error_code(), "analysis failed");
                self.result = None;
                self.error = Some(err.user_message());
                self.state = LoadingState::Error;
            }
        }
        true
    }

    /// Give up on `submission` without an outcome. The bench accepts new
    /// submissions again; nothing is shown for the abandoned one.
    pub fn abandon(&mut self, submission: &Submission) {
        if self.release(submission.generation) {
            debug!(submitted = submission.generation, "analysis abandoned");
        }
    }

    /// Clear the in-flight slot if it holds `generation`. A bench left
    /// `Analyzing` by it drops back to `Idle`.
    fn release(&mut self, generation: u64) -> bool {
        if self.in_flight != Some(generation) {
            return false;
        }
        self.in_flight = None;
        if self.state == LoadingState::Analyzing {
            self.state = LoadingState::Idle;
        }
        true
    }

    /// Back to an empty form. The knowledge text is kept; any outstanding
    /// analysis is discarded when it finishes.
    pub fn reset(&mut self) {
        self.replace_image(None);
    }

    /// Submit, call `client` once, and apply the outcome. Dropping the
    /// returned future before it completes abandons the submission.
    ///
    /// # Errors
    ///
    /// Only when the submission itself is refused; analysis failures land
    /// in [`Workbench::error_message`].
    pub async fn run(&mut self, client: &dyn VisionChat) -> Result<LoadingState, SubmitError> {
        let submission = self.submit()?;
        let mut pending = Pending { bench: self, generation: Some(submission.generation) };
        let outcome = analysis::analyze_with(client, submission.image(), submission.knowledge()).await;
        pending.generation = None;
        pending.bench.finish(&submission, outcome);
        Ok(pending.bench.state)
    }
}

/// Abandons the outstanding submission on drop unless disarmed.
struct Pending<'a> {
    bench: &'a mut Workbench,
    generation: Option<u64>,
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if let Some(generation) = self.generation.take() {
            if self.bench.release(generation) {
                debug!(submitted = generation, "analysis dropped before completion");
            }
        }
    }
}

#[cfg(test)]
#[path = "workbench_test.rs"]
mod tests;
