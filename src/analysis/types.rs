//! Structured analysis result and its validation.
//!
//! Field names follow the wire keys the model is asked to produce
//! (`resumo_visual`, `comandos`, ...); Rust names follow their meaning.
//! Decoding is strict on shape and on the three priority labels: anything
//! else is a [`AssistError::ResponseFormat`], never a silent default.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AssistError;

// =============================================================================
// PRIORITY
// =============================================================================

/// Priority of an action step. Wire labels are Portuguese.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "Alta")]
    High,
    #[serde(rename = "Média")]
    Medium,
    #[serde(rename = "Baixa")]
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Wire and display label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "Alta",
            Self::Medium => "Média",
            Self::Low => "Baixa",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// RESPONSE SHAPE
// =============================================================================

/// What the model saw in the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualSummary {
    #[serde(rename = "tipo")]
    pub equipment_type: String,
    /// OCR output, in reading order.
    #[serde(rename = "textos")]
    pub extracted_texts: Vec<String>,
    #[serde(rename = "sintomas")]
    pub observed_symptoms: Vec<String>,
    #[serde(rename = "hipoteses")]
    pub hypotheses: Vec<String>,
    #[serde(rename = "termos_chave", default, skip_serializing_if = "Vec::is_empty")]
    pub key_terms: Vec<String>,
}

/// One prioritized remediation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStep {
    #[serde(rename = "prioridade")]
    pub priority: Priority,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "execucao")]
    pub execution_commands: Vec<String>,
    pub pre_checks: Vec<String>,
    #[serde(rename = "pos_checks")]
    pub post_checks: Vec<String>,
    #[serde(rename = "rollback")]
    pub rollback_commands: Vec<String>,
    #[serde(rename = "notas", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The full structured answer for one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineeringResponse {
    #[serde(rename = "resumo_visual")]
    pub visual_summary: VisualSummary,
    #[serde(rename = "perguntas", default)]
    pub open_questions: Vec<String>,
    /// Execution order is significant.
    #[serde(rename = "comandos")]
    pub action_steps: Vec<ActionStep>,
    /// Placeholders such as `<IP>`; unique, first-seen order.
    #[serde(rename = "variaveis_para_confirmar", default)]
    pub variables_to_confirm: Vec<String>,
    #[serde(rename = "riscos_e_precaucoes", default)]
    pub risks_and_precautions: Vec<String>,
    #[serde(rename = "fontes", default)]
    pub sources: Vec<String>,
}

impl EngineeringResponse {
    /// Parse and validate raw model output.
    ///
    /// # Errors
    ///
    /// Returns [`AssistError::ResponseFormat`] when the text is blank, is not
    /// a JSON object, or does not match the response shape (including any
    /// priority outside `Alta`/`Média`/`Baixa`).
    pub fn from_json(text: &str) -> Result<Self, AssistError> {
        if text.trim().is_empty() {
            return Err(AssistError::ResponseFormat("empty response body".into()));
        }
        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
            warn!(error = %e, "response is not valid JSON");
            AssistError::ResponseFormat(format!("invalid JSON: {e}"))
        })?;
        if !value.is_object() {
            return Err(AssistError::ResponseFormat("expected a JSON object".into()));
        }
        let response: Self = serde_json::from_value(value).map_err(|e| {
            warn!(error = %e, "response does not match schema");
            AssistError::ResponseFormat(format!("schema mismatch: {e}"))
        })?;
        Ok(response.normalized())
    }

    /// Deduplicate placeholders and drop blank notes.
    fn normalized(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.variables_to_confirm.retain(|v| seen.insert(v.clone()));
        for step in &mut self.action_steps {
            if step.notes.as_deref().is_some_and(|n| n.trim().is_empty()) {
                step.notes = None;
            }
        }
        self
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
