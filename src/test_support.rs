//! Shared helpers for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::llm::types::{LlmError, VisionChat, VisionRequest, VisionResponse};
use crate::payload::ImagePayload;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that read or mutate process environment variables.
pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes every variable the LLM config reads.
///
/// # Safety
/// Caller must hold [`env_lock`].
pub unsafe fn clear_llm_env() {
    for key in [
        "LLM_PROVIDER",
        "LLM_MODEL",
        "LLM_API_KEY_ENV",
        "LLM_GEMINI_BASE_URL",
        "LLM_OPENAI_BASE_URL",
        "LLM_MAX_OUTPUT_TOKENS",
        "LLM_REQUEST_TIMEOUT_SECS",
        "LLM_CONNECT_TIMEOUT_SECS",
        "API_KEY",
        "OPENAI_API_KEY",
        "TEST_KEY",
    ] {
        unsafe { std::env::remove_var(key) };
    }
}

// =============================================================================
// MOCK BACKEND
// =============================================================================

/// Backend double that answers once with a canned outcome and records calls.
pub struct MockVision {
    outcome: Mutex<Option<Result<VisionResponse, LlmError>>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<VisionRequest>>,
}

impl MockVision {
    pub fn replying(text: &str) -> Self {
        Self::with_outcome(Ok(VisionResponse {
            text: text.to_string(),
            model: "mock".into(),
            input_tokens: 0,
            output_tokens: 0,
        }))
    }

    pub fn failing(err: LlmError) -> Self {
        Self::with_outcome(Err(err))
    }

    fn with_outcome(outcome: Result<VisionResponse, LlmError>) -> Self {
        Self { outcome: Mutex::new(Some(outcome)), calls: AtomicUsize::new(0), last_request: Mutex::new(None) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<VisionRequest> {
        self.last_request.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait::async_trait]
impl VisionChat for MockVision {
    async fn generate(&self, request: &VisionRequest) -> Result<VisionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap_or_else(PoisonError::into_inner) = Some(request.clone());
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or(Err(LlmError::ApiRequest("mock already answered".into())))
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

pub fn jpeg_image() -> ImagePayload {
    ImagePayload { bytes: vec![0xFF, 0xD8, 0xFF, 0xE0], media_type: "image/jpeg".into(), name: "switch.jpg".into() }
}

/// One high-priority network restart step, one risk, one source, no questions.
pub fn single_step_json() -> String {
    serde_json::json!({
        "resumo_visual": {
            "tipo": "Servidor Linux",
            "textos": ["networking.service: Failed with result 'exit-code'"],
            "sintomas": ["serviço de rede parado"],
            "hipoteses": ["arquivo de interfaces inválido"]
        },
        "comandos": [{
            "prioridade": "Alta",
            "descricao": "Reiniciar serviço",
            "execucao": ["systemctl restart networking"],
            "pre_checks": ["systemctl status networking"],
            "pos_checks": ["systemctl status networking"],
            "rollback": ["systemctl restart networking"]
        }],
        "perguntas": [],
        "variaveis_para_confirmar": [],
        "riscos_e_precaucoes": ["Pode causar breve interrupção"],
        "fontes": ["DOC#B09"]
    })
    .to_string()
}
