//! OpenAI-compatible chat completions client.
//!
//! Sends the image as a `data:` URI `image_url` part and constrains the
//! answer with `response_format: json_schema`. Works against any server that
//! speaks `/v1/chat/completions`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::config::LlmTimeouts;
use super::types::{LlmError, VisionRequest, VisionResponse, non_blank};

const SCHEMA_NAME: &str = "engineering_response";

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    max_output_tokens: u32,
}

impl OpenAiClient {
    /// # Errors
    ///
    /// Returns [`LlmError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(
        api_key: String,
        base_url: String,
        max_output_tokens: u32,
        timeouts: LlmTimeouts,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key, base_url, max_output_tokens })
    }

    /// Run one chat completion.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] on transport failure, non-2xx status, a refusal,
    /// a malformed envelope, or empty output.
    pub async fn generate(&self, model: &str, request: &VisionRequest) -> Result<VisionResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let image_url = request.image.data_uri();
        let body = build_request(model, self.max_output_tokens, request, &image_url);

        debug!(%model, image_bytes = request.image.bytes.len(), "openai chat completion");
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::ApiResponse { status: status.as_u16(), body: text });
        }

        let parsed = parse_response(&text)?;
        info!(
            model = %parsed.model,
            input_tokens = parsed.input_tokens,
            output_tokens = parsed.output_tokens,
            "openai response received"
        );
        Ok(parsed)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct CcRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<CcMessage<'a>>,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct CcMessage<'a> {
    role: &'static str,
    content: CcContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum CcContent<'a> {
    Text(&'a str),
    Parts(Vec<CcPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CcPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'static str,
    schema: &'a Value,
    strict: bool,
}

#[derive(Deserialize)]
struct CcResponse {
    #[serde(default)]
    choices: Vec<CcChoice>,
    model: Option<String>,
    usage: Option<CcUsage>,
}

#[derive(Deserialize)]
struct CcChoice {
    message: CcResponseMessage,
}

#[derive(Deserialize)]
struct CcResponseMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct CcUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

// =============================================================================
// BUILDING / PARSING
// =============================================================================

fn build_request<'a>(
    model: &'a str,
    max_tokens: u32,
    request: &'a VisionRequest,
    image_url: &'a str,
) -> CcRequest<'a> {
    let mut messages = Vec::with_capacity(2);
    if !request.system.trim().is_empty() {
        messages.push(CcMessage { role: "system", content: CcContent::Text(&request.system) });
    }
    messages.push(CcMessage {
        role: "user",
        content: CcContent::Parts(vec![
            CcPart::Text { text: &request.prompt },
            CcPart::ImageUrl { image_url: ImageUrl { url: image_url } },
        ]),
    });
    CcRequest {
        model,
        max_tokens,
        messages,
        response_format: ResponseFormat {
            format_type: "json_schema",
            json_schema: JsonSchemaFormat { name: SCHEMA_NAME, schema: &request.response_schema, strict: false },
        },
    }
}

fn parse_response(json: &str) -> Result<VisionResponse, LlmError> {
    let api: CcResponse = serde_json::from_str(json).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let message = api.choices.into_iter().next().map(|c| c.message);

    if let Some(CcResponseMessage { content: None, refusal: Some(refusal) }) = &message {
        return Err(LlmError::Blocked(refusal.clone()));
    }

    let text = message.and_then(|m| m.content).unwrap_or_default();
    let (input_tokens, output_tokens) = api
        .usage
        .map_or((0, 0), |u| (u.prompt_tokens, u.completion_tokens));

    Ok(VisionResponse {
        text: non_blank(text)?,
        model: api.model.unwrap_or_default(),
        input_tokens,
        output_tokens,
    })
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
