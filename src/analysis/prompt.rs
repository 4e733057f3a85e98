//! Request composition: instructions, knowledge section, response schema.
//!
//! Pure functions. Any image and any knowledge text compose into a valid
//! request; rejection happens downstream.

use serde_json::{Value, json};

use super::types::Priority;
use crate::llm::types::VisionRequest;
use crate::payload::ImagePayload;

/// Short system-level instruction sent alongside the task prompt.
pub const SYSTEM_INSTRUCTION: &str =
    "You are an expert engineering assistant. Always output valid JSON matching the requested schema.";

/// Stands in for the knowledge section when the user supplied none.
pub const EMPTY_KNOWLEDGE_NOTICE: &str = "Nenhum conhecimento específico fornecido. Use melhores práticas gerais.";

pub const KNOWLEDGE_HEADING: &str = "CONHECIMENTO RECUPERADO (RAG):";

/// Task and safety policy, in Brazilian Portuguese like the expected answer.
pub const TASK_INSTRUCTIONS: &str = "\
Você é um assistente de engenharia. Analise a IMAGEM enviada e produza um plano de comandos seguro, \
apoiado na Base de Conhecimento (RAG) fornecida.

Tarefas:
1) Análise da imagem:
   - Identifique o tipo de ambiente ou equipamento (switch/roteador, servidor Linux/Windows, painel industrial, tela de erro, diagrama).
   - Faça OCR dos textos visíveis (mensagens, códigos de erro, versões, interfaces, IPs, serviços), transcrevendo-os como aparecem.
   - Descreva sintomas e indícios (porta down, falha de autenticação, timeout, conflito de VLAN, serviço parado).
   - Liste hipóteses plausíveis sem afirmá-las como fato quando houver ambiguidade.
2) Use o conhecimento recuperado, quando houver, para gerar comandos e procedimentos compatíveis com fabricante, SO e versão deduzidos.
   Se houver divergência entre a imagem e o conhecimento, peça confirmação objetiva antes de qualquer comando arriscado.
3) Responda somente com JSON estruturado conforme o schema.

Regras:
- Compatibilidade: gere comandos apenas para o SO/equipamento deduzido ou confirmado. Se incerto, pergunte antes em \"perguntas\".
- Segurança: nunca proponha comandos destrutivos (rm -rf, format, write erase, drop database) sem pré-checks e rollback; \
quando inevitáveis, peça confirmação explícita e explique o impacto.
- Validação: todo bloco de comandos tem pré-checks (estado atual, versão, existência do recurso), pós-checks (resultado esperado) e rollback.
- Prioridade: classifique cada bloco como Alta, Média ou Baixa e justifique na descrição ou nas notas quando necessário.
- Placeholders: use <IP>, <HOSTNAME>, <VLAN>, <INTERFACE>, <CAMINHO>, <USUARIO>, <SENHA>, <VERSAO> para valores não confirmados \
e liste-os em \"variaveis_para_confirmar\".
- Contexto insuficiente: inclua perguntas objetivas em \"perguntas\".
- Fontes: referencie os IDs ou metadados dos trechos do RAG usados em cada comando, quando fornecidos.
- Responda em português do Brasil.";

/// Example knowledge excerpt for trying the tool without a document base.
pub const SAMPLE_KNOWLEDGE: &str = "\
[DOC#A12 | fabricante=Cisco | so=IOS | tema=Interface | risco=baixo]
Para verificar status de interface: show ip interface brief
Para habilitar interface:
conf t
interface <INTERFACE>
no shutdown
end

[DOC#B09 | so=Linux | tema=Rede | risco=médio]
Verificar rotas: ip route show
Reiniciar serviço de rede: systemctl restart networking
Logs de erro: journalctl -xeu networking.service";

/// Task instructions followed by the delimited knowledge section.
#[must_use]
pub fn build_prompt(knowledge: &str) -> String {
    let knowledge = if knowledge.trim().is_empty() { EMPTY_KNOWLEDGE_NOTICE } else { knowledge };
    format!("{TASK_INSTRUCTIONS}\n\n---\n{KNOWLEDGE_HEADING}\n{knowledge}\n---\n")
}

/// Compose the single outbound request for one analysis.
#[must_use]
pub fn compose(image: &ImagePayload, knowledge: &str) -> VisionRequest {
    VisionRequest {
        system: SYSTEM_INSTRUCTION.to_string(),
        prompt: build_prompt(knowledge),
        image: image.clone(),
        response_schema: response_schema(),
    }
}

/// JSON schema for the structured answer, using the wire keys.
#[must_use]
pub fn response_schema() -> Value {
    let strings = json!({ "type": "array", "items": { "type": "string" } });
    let priorities: Vec<&str> = Priority::ALL.iter().map(|p| p.label()).collect();

    json!({
        "type": "object",
        "properties": {
            "resumo_visual": {
                "type": "object",
                "properties": {
                    "tipo": { "type": "string", "description": "Tipo de ambiente ou equipamento identificado" },
                    "textos": strings,
                    "sintomas": strings,
                    "hipoteses": strings,
                    "termos_chave": strings
                },
                "required": ["tipo", "textos", "sintomas", "hipoteses"]
            },
            "perguntas": strings,
            "comandos": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "prioridade": { "type": "string", "enum": priorities },
                        "descricao": { "type": "string" },
                        "execucao": strings,
                        "pre_checks": strings,
                        "pos_checks": strings,
                        "rollback": strings,
                        "notas": { "type": "string" }
                    },
                    "required": ["prioridade", "descricao", "execucao", "pre_checks", "pos_checks", "rollback"]
                }
            },
            "variaveis_para_confirmar": strings,
            "riscos_e_precaucoes": strings,
            "fontes": strings
        },
        "required": [
            "resumo_visual",
            "perguntas",
            "comandos",
            "variaveis_para_confirmar",
            "riscos_e_precaucoes",
            "fontes"
        ]
    })
}

#[cfg(test)]
#[path = "prompt_test.rs"]
mod tests;
