//! Result renderer: an `EngineeringResponse` as an ordered report.
//!
//! `Report::from_response` is pure. It keeps every sequence in response
//! order and never emits a section for an empty sequence. `Display` turns
//! the report into plain text for the terminal.

use std::fmt;

use crate::analysis::{ActionStep, EngineeringResponse, Priority, VisualSummary};

/// OCR texts beyond this count are not shown.
pub const MAX_OCR_TEXTS: usize = 8;

pub const REPORT_TITLE: &str = "Relatório de Incidente";

// =============================================================================
// MODEL
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// `label: value`
    Field { label: &'static str, value: String },
    /// `- text`
    Bullet(String),
    /// `$ cmd`, a read-only check.
    Check(String),
    /// `> cmd`, a command that changes state.
    Command(String),
    Plain(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    /// Priority badge; set only on action steps.
    pub badge: Option<Priority>,
    pub lines: Vec<Line>,
    pub children: Vec<Section>,
}

impl Section {
    fn new(heading: impl Into<String>) -> Self {
        Self { heading: heading.into(), badge: None, lines: Vec::new(), children: Vec::new() }
    }

    fn with_lines(heading: impl Into<String>, lines: Vec<Line>) -> Self {
        Self { lines, ..Self::new(heading) }
    }

    fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.children.is_empty()
    }

    /// First direct child with this heading.
    #[must_use]
    pub fn child(&self, heading: &str) -> Option<&Section> {
        self.children.iter().find(|c| c.heading == heading)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub title: String,
    pub sections: Vec<Section>,
}

impl Report {
    #[must_use]
    pub fn from_response(response: &EngineeringResponse) -> Self {
        let sections = [
            visual_summary(&response.visual_summary),
            bullets("Perguntas Pendentes", &response.open_questions),
            action_plan(&response.action_steps),
            bullets("Confirmar Variáveis", &response.variables_to_confirm),
            bullets("Riscos & Precauções", &response.risks_and_precautions),
            bullets("Fontes utilizadas", &response.sources),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self { title: REPORT_TITLE.to_string(), sections }
    }

    /// Top-level section with this heading.
    #[must_use]
    pub fn section(&self, heading: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.heading == heading)
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

fn bullet_lines(items: &[String]) -> Vec<Line> {
    items.iter().cloned().map(Line::Bullet).collect()
}

fn bullets(heading: &str, items: &[String]) -> Option<Section> {
    (!items.is_empty()).then(|| Section::with_lines(heading, bullet_lines(items)))
}

fn visual_summary(summary: &VisualSummary) -> Option<Section> {
    let mut section = Section::new("Análise Visual");
    if !summary.equipment_type.trim().is_empty() {
        section.lines.push(Line::Field { label: "Tipo Identificado", value: summary.equipment_type.clone() });
    }

    let ocr: Vec<String> = summary.extracted_texts.iter().take(MAX_OCR_TEXTS).cloned().collect();
    section.children.extend(
        [
            bullets("Sintomas Detectados", &summary.observed_symptoms),
            bullets("Texto OCR Relevante", &ocr),
            bullets("Hipóteses", &summary.hypotheses),
            bullets("Termos-chave", &summary.key_terms),
        ]
        .into_iter()
        .flatten(),
    );

    (!section.is_empty()).then_some(section)
}

fn action_plan(steps: &[ActionStep]) -> Option<Section> {
    if steps.is_empty() {
        return None;
    }
    let count = match steps.len() {
        1 => "1 Passo".to_string(),
        n => format!("{n} Passos"),
    };
    let mut section = Section::with_lines("Plano de Engenharia", vec![Line::Plain(count)]);
    section.children = steps.iter().enumerate().map(|(i, step)| action_step(i + 1, step)).collect();
    Some(section)
}

fn action_step(number: usize, step: &ActionStep) -> Section {
    let mut section = Section::new(format!("#{number} [{}] {}", step.priority, step.description));
    section.badge = Some(step.priority);

    let checks = |items: &[String]| items.iter().cloned().map(Line::Check).collect::<Vec<_>>();
    let commands = |items: &[String]| items.iter().cloned().map(Line::Command).collect::<Vec<_>>();

    let mut blocks = vec![
        ("Pre-Checks / Validações Iniciais", checks(&step.pre_checks)),
        ("Execução", commands(&step.execution_commands)),
    ];
    if let Some(note) = &step.notes {
        blocks.push(("Nota", vec![Line::Plain(note.clone())]));
    }
    blocks.push(("Post-Checks", checks(&step.post_checks)));
    blocks.push(("Rollback Plan", commands(&step.rollback_commands)));

    section.children = blocks
        .into_iter()
        .filter(|(_, lines)| !lines.is_empty())
        .map(|(heading, lines)| Section::with_lines(heading, lines))
        .collect();
    section
}

// =============================================================================
// TEXT
// =============================================================================

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field { label, value } => write!(f, "{label}: {value}"),
            Self::Bullet(text) => write!(f, "- {text}"),
            Self::Check(cmd) => write!(f, "$ {cmd}"),
            Self::Command(cmd) => write!(f, "> {cmd}"),
            Self::Plain(text) => f.write_str(text),
        }
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, section: &Section, depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    writeln!(f)?;
    writeln!(f, "{indent}{}", section.heading)?;
    if depth == 0 {
        writeln!(f, "{}", "-".repeat(section.heading.chars().count()))?;
    }
    for line in &section.lines {
        writeln!(f, "{indent}{line}")?;
    }
    for child in &section.children {
        write_section(f, child, depth + 1)?;
    }
    Ok(())
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", "=".repeat(self.title.chars().count()))?;
        for section in &self.sections {
            write_section(f, section, 0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
