use super::*;
use crate::llm::types::LlmError;
use crate::test_support::{MockVision, clear_llm_env, env_lock, jpeg_image, single_step_json};

// =========================================================================
// analyze: configuration
// =========================================================================

#[tokio::test]
async fn missing_credential_fails_before_any_client_exists() {
    let _env = env_lock();
    unsafe {
        clear_llm_env();
        // An unroutable endpoint: reaching the network would surface a Backend error instead.
        std::env::set_var("LLM_GEMINI_BASE_URL", "http://192.0.2.1:9");
    }

    let err = analyze(&jpeg_image(), "").await.unwrap_err();
    assert!(matches!(err, AssistError::Configuration(_)), "got {err:?}");

    unsafe { clear_llm_env() };
}

#[tokio::test]
async fn unknown_provider_is_configuration_error() {
    let _env = env_lock();
    unsafe {
        clear_llm_env();
        std::env::set_var("API_KEY", "secret");
        std::env::set_var("LLM_PROVIDER", "carrier-pigeon");
    }

    let err = analyze(&jpeg_image(), "").await.unwrap_err();
    assert!(matches!(err, AssistError::Configuration(_)));

    unsafe { clear_llm_env() };
}

// =========================================================================
// analyze_with: success
// =========================================================================

#[tokio::test]
async fn returns_validated_response() {
    let mock = MockVision::replying(&single_step_json());
    let resp = analyze_with(&mock, &jpeg_image(), "[DOC#B09] systemctl restart networking")
        .await
        .unwrap();
    assert_eq!(resp.action_steps.len(), 1);
    assert_eq!(resp.action_steps[0].priority, Priority::High);
    assert_eq!(resp.sources, vec!["DOC#B09"]);
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn request_carries_image_and_knowledge() {
    let mock = MockVision::replying(&single_step_json());
    analyze_with(&mock, &jpeg_image(), "[DOC#A12] show ip interface brief")
        .await
        .unwrap();
    let request = mock.last_request().unwrap();
    assert_eq!(request.image, jpeg_image());
    assert!(request.prompt.contains("[DOC#A12] show ip interface brief"));
    assert_eq!(request.response_schema, prompt::response_schema());
}

#[tokio::test]
async fn empty_knowledge_sends_best_practices_notice() {
    let mock = MockVision::replying(&single_step_json());
    analyze_with(&mock, &jpeg_image(), "").await.unwrap();
    let request = mock.last_request().unwrap();
    assert!(request.prompt.contains(prompt::EMPTY_KNOWLEDGE_NOTICE));
}

// =========================================================================
// analyze_with: failures
// =========================================================================

#[tokio::test]
async fn out_of_set_priority_is_response_format() {
    let body = single_step_json().replace("\"Alta\"", "\"Urgente\"");
    let mock = MockVision::replying(&body);
    let err = analyze_with(&mock, &jpeg_image(), "").await.unwrap_err();
    assert!(matches!(err, AssistError::ResponseFormat(_)));
}

#[tokio::test]
async fn empty_output_is_response_format() {
    let mock = MockVision::failing(LlmError::EmptyOutput);
    let err = analyze_with(&mock, &jpeg_image(), "").await.unwrap_err();
    assert!(matches!(err, AssistError::ResponseFormat(_)));
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn non_json_output_is_response_format() {
    let mock = MockVision::replying("Claro! Aqui está o plano: reinicie o serviço.");
    let err = analyze_with(&mock, &jpeg_image(), "").await.unwrap_err();
    assert!(matches!(err, AssistError::ResponseFormat(_)));
}

#[tokio::test]
async fn transport_failure_is_backend_and_not_retried() {
    let mock = MockVision::failing(LlmError::ApiRequest("connection reset by peer".into()));
    let err = analyze_with(&mock, &jpeg_image(), "").await.unwrap_err();
    assert!(matches!(&err, AssistError::Backend(m) if m.contains("connection reset")));
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn auth_rejection_is_backend() {
    let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key."}}"#;
    let mock = MockVision::failing(LlmError::ApiResponse { status: 400, body: body.into() });
    let err = analyze_with(&mock, &jpeg_image(), "").await.unwrap_err();
    assert!(matches!(&err, AssistError::Backend(m) if m.contains("API key not valid")));
}
