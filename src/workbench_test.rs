use std::time::Duration;

use super::*;
use crate::error::GENERIC_FAILURE_MESSAGE;
use crate::llm::types::{LlmError, VisionRequest, VisionResponse};
use crate::test_support::{MockVision, jpeg_image, single_step_json};

fn png_image() -> ImagePayload {
    ImagePayload { bytes: vec![0x89, b'P', b'N', b'G'], media_type: "image/png".into(), name: "panel.png".into() }
}

fn response() -> EngineeringResponse {
    EngineeringResponse::from_json(&single_step_json()).unwrap()
}

// =========================================================================
// submit guard
// =========================================================================

#[test]
fn submit_without_image_is_refused() {
    let mut bench = Workbench::new();
    assert_eq!(bench.submit().unwrap_err(), SubmitError::NoImage);
    assert_eq!(bench.state(), LoadingState::Idle);
    assert!(!bench.can_submit());
}

#[test]
fn submit_while_analyzing_is_refused() {
    let mut bench = Workbench::new();
    bench.select_image(jpeg_image());
    bench.submit().unwrap();
    assert_eq!(bench.state(), LoadingState::Analyzing);
    assert!(!bench.can_submit());
    assert_eq!(bench.submit().unwrap_err(), SubmitError::Busy);
}

#[test]
fn submission_snapshots_inputs() {
    let mut bench = Workbench::with_knowledge("[DOC#B09] systemctl restart networking");
    bench.select_image(jpeg_image());
    let submission = bench.submit().unwrap();
    assert_eq!(submission.image(), &jpeg_image());
    assert_eq!(submission.knowledge(), "[DOC#B09] systemctl restart networking");
    assert_eq!(submission.generation(), bench.generation());
}

// =========================================================================
// finish
// =========================================================================

#[test]
fn success_stores_result() {
    let mut bench = Workbench::new();
    bench.select_image(jpeg_image());
    let submission = bench.submit().unwrap();

    assert!(bench.finish(&submission, Ok(response())));
    assert_eq!(bench.state(), LoadingState::Success);
    assert_eq!(bench.result().unwrap().action_steps.len(), 1);
    assert!(bench.error_message().is_none());
}

#[test]
fn failure_keeps_image_and_shows_user_message() {
    let mut bench = Workbench::new();
    bench.select_image(jpeg_image());
    let submission = bench.submit().unwrap();

    let applied = bench.finish(&submission, Err(AssistError::ResponseFormat("empty response body".into())));
    assert!(applied);
    assert_eq!(bench.state(), LoadingState::Error);
    assert_eq!(bench.error_message(), Some(GENERIC_FAILURE_MESSAGE));
    assert_eq!(bench.image(), Some(&jpeg_image()));
    assert!(bench.result().is_none());
}

#[test]
fn backend_failure_message_is_verbatim() {
    let mut bench = Workbench::new();
    bench.select_image(jpeg_image());
    let submission = bench.submit().unwrap();

    bench.finish(&submission, Err(AssistError::Backend("Quota exceeded (HTTP 429)".into())));
    assert_eq!(bench.error_message(), Some("Quota exceeded (HTTP 429)"));
}

#[test]
fn resubmit_allowed_after_error_and_success() {
    let mut bench = Workbench::new();
    bench.select_image(jpeg_image());

    let first = bench.submit().unwrap();
    bench.finish(&first, Err(AssistError::Backend("timeout".into())));
    let second = bench.submit().unwrap();
    assert!(bench.error_message().is_none());
    bench.finish(&second, Ok(response()));
    assert!(bench.submit().is_ok());
}

// =========================================================================
// staleness
// =========================================================================

#[test]
fn reset_discards_late_result() {
    let mut bench = Workbench::new();
    bench.select_image(jpeg_image());
    let submission = bench.submit().unwrap();

    bench.reset();
    assert!(bench.image().is_none());
    assert_eq!(bench.state(), LoadingState::Analyzing);

    assert!(!bench.finish(&submission, Ok(response())));
    assert!(bench.result().is_none());
    assert_eq!(bench.state(), LoadingState::Idle);
}

#[test]
fn new_image_does_not_allow_overlapping_submission() {
    let mut bench = Workbench::new();
    bench.select_image(jpeg_image());
    let first = bench.submit().unwrap();

    bench.select_image(png_image());
    assert_eq!(bench.state(), LoadingState::Analyzing);
    assert!(!bench.can_submit());
    assert_eq!(bench.submit().unwrap_err(), SubmitError::Busy);

    assert!(!bench.finish(&first, Ok(response())));
    assert_eq!(bench.state(), LoadingState::Idle);
    let second = bench.submit().unwrap();
    assert_eq!(second.image(), &png_image());
}

#[test]
fn capture_and_remove_keep_outstanding_guard() {
    let mut bench = Workbench::new();
    bench.select_image(png_image());
    bench.submit().unwrap();

    bench.accept_capture(jpeg_image());
    assert_eq!(bench.submit().unwrap_err(), SubmitError::Busy);
    bench.remove_image();
    bench.select_image(jpeg_image());
    assert_eq!(bench.submit().unwrap_err(), SubmitError::Busy);
}

#[test]
fn abandon_frees_the_slot_and_shows_nothing() {
    let mut bench = Workbench::new();
    bench.select_image(jpeg_image());
    let submission = bench.submit().unwrap();

    bench.abandon(&submission);
    assert_eq!(bench.state(), LoadingState::Idle);
    assert!(bench.error_message().is_none());
    assert!(bench.can_submit());

    assert!(!bench.finish(&submission, Ok(response())));
    assert!(bench.result().is_none());
}

#[test]
fn new_image_discards_outstanding_result() {
    let mut bench = Workbench::new();
    bench.select_image(jpeg_image());
    let submission = bench.submit().unwrap();

    bench.select_image(png_image());
    assert!(!bench.finish(&submission, Err(AssistError::Backend("late".into()))));
    assert!(bench.error_message().is_none());
    assert_eq!(bench.image(), Some(&png_image()));
}

#[test]
fn finishing_twice_applies_once() {
    let mut bench = Workbench::new();
    bench.select_image(jpeg_image());
    let submission = bench.submit().unwrap();

    assert!(bench.finish(&submission, Ok(response())));
    assert!(!bench.finish(&submission, Err(AssistError::Backend("dup".into()))));
    assert_eq!(bench.state(), LoadingState::Success);
}

// =========================================================================
// inputs
// =========================================================================

#[test]
fn capture_replaces_image_and_clears_result() {
    let mut bench = Workbench::new();
    bench.select_image(png_image());
    let submission = bench.submit().unwrap();
    bench.finish(&submission, Ok(response()));

    bench.accept_capture(jpeg_image());
    assert_eq!(bench.image(), Some(&jpeg_image()));
    assert!(bench.result().is_none());
    assert_eq!(bench.state(), LoadingState::Idle);
}

#[test]
fn reset_keeps_knowledge_and_clear_empties_it() {
    let mut bench = Workbench::with_knowledge("[DOC#A12]");
    bench.reset();
    assert_eq!(bench.knowledge(), "[DOC#A12]");
    bench.clear_knowledge();
    assert_eq!(bench.knowledge(), "");
    bench.set_knowledge("[DOC#B09]");
    assert_eq!(bench.knowledge(), "[DOC#B09]");
}

// =========================================================================
// run
// =========================================================================

#[tokio::test]
async fn run_success() {
    let mock = MockVision::replying(&single_step_json());
    let mut bench = Workbench::new();
    bench.select_image(jpeg_image());

    assert_eq!(bench.run(&mock).await.unwrap(), LoadingState::Success);
    assert_eq!(bench.result().unwrap().sources, vec!["DOC#B09"]);
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn run_empty_body_keeps_image_with_generic_message() {
    let mock = MockVision::failing(LlmError::EmptyOutput);
    let mut bench = Workbench::new();
    bench.select_image(jpeg_image());

    assert_eq!(bench.run(&mock).await.unwrap(), LoadingState::Error);
    assert_eq!(bench.error_message(), Some(GENERIC_FAILURE_MESSAGE));
    assert_eq!(bench.image(), Some(&jpeg_image()));
}

#[tokio::test]
async fn run_without_image_never_calls_backend() {
    let mock = MockVision::replying(&single_step_json());
    let mut bench = Workbench::new();
    assert_eq!(bench.run(&mock).await.unwrap_err(), SubmitError::NoImage);
    assert_eq!(mock.calls(), 0);
}

/// Backend that never answers.
struct Stalled;

#[async_trait::async_trait]
impl VisionChat for Stalled {
    async fn generate(&self, _request: &VisionRequest) -> Result<VisionResponse, LlmError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn dropped_run_releases_the_slot() {
    let mut bench = Workbench::new();
    bench.select_image(jpeg_image());

    let timed_out = tokio::time::timeout(Duration::from_millis(20), bench.run(&Stalled)).await;
    assert!(timed_out.is_err());

    assert_eq!(bench.state(), LoadingState::Idle);
    assert!(bench.can_submit());
    assert_eq!(bench.image(), Some(&jpeg_image()));
}
