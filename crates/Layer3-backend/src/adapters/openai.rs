//! OpenAI Responses API adapter

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use cmtr_core::{build_system_prompt, build_user_prompt, CommitContext};
use cmtr_foundation::Settings;

use crate::adapters::effective_timeout;
use crate::error::BackendError;
use crate::message::GeneratedMessage;
use crate::r#trait::Backend;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Commit messages are short; this keeps runaway generations bounded.
const MAX_OUTPUT_TOKENS: u32 = 200;

/// Backend that issues one request to the Responses API
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    base_url: String,
    organization: Option<String>,
}

impl OpenAiBackend {
    /// Create the adapter. The key is supplied by the selector, which has
    /// already verified it is present.
    pub fn new(api_key: String, settings: &Settings) -> Result<Self, BackendError> {
        let mut builder = Client::builder();
        if let Some(timeout) = effective_timeout(settings.timeout_seconds) {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| BackendError::request(err.to_string()))?;

        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client,
            api_key,
            base_url,
            organization: settings.organization.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.base_url.trim_end_matches('/'))
    }

    fn build_request(&self, context: &CommitContext, settings: &Settings) -> ResponsesRequest {
        ResponsesRequest {
            model: settings.model.clone(),
            input: vec![
                InputMessage {
                    role: "system",
                    content: build_system_prompt().to_string(),
                },
                InputMessage {
                    role: "user",
                    content: build_user_prompt(context),
                },
            ],
            max_output_tokens: MAX_OUTPUT_TOKENS,
            reasoning: (!settings.reasoning_effort.is_empty()).then(|| Reasoning {
                effort: settings.reasoning_effort.clone(),
            }),
            text: (!settings.text_verbosity.is_empty()).then(|| TextOptions {
                verbosity: settings.text_verbosity.clone(),
            }),
        }
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn generate(
        &self,
        context: &CommitContext,
        settings: &Settings,
    ) -> Result<GeneratedMessage, BackendError> {
        let request = self.build_request(context, settings);
        debug!(model = %request.model, endpoint = %self.endpoint(), "sending responses request");

        let mut http = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request);
        if let Some(org) = &self.organization {
            http = http.header("OpenAI-Organization", org);
        }

        let response = http.send().await.map_err(|err| {
            if err.is_timeout() {
                BackendError::Timeout {
                    seconds: settings.timeout_seconds,
                }
            } else {
                BackendError::request(err.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_http_status(status, &body));
        }

        let reply: ResponsesReply = response
            .json()
            .await
            .map_err(|err| BackendError::request(err.to_string()))?;

        let text = extract_output_text(&reply);
        GeneratedMessage::from_raw(&text).ok_or(BackendError::EmptyResponse)
    }
}

/// Pull the generated text out of a reply, preferring the flattened
/// `output_text` field when the server provides it
fn extract_output_text(reply: &ResponsesReply) -> String {
    if let Some(text) = &reply.output_text {
        if !text.trim().is_empty() {
            return text.clone();
        }
    }

    let mut parts = Vec::new();
    for item in &reply.output {
        if item.item_type != "message" {
            continue;
        }
        for chunk in &item.content {
            if chunk.chunk_type == "output_text" || chunk.chunk_type == "text" {
                parts.push(chunk.text.as_str());
            }
        }
    }
    parts.concat().trim().to_string()
}

// ============================================================================
// Responses API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ResponsesRequest {
    model: String,
    input: Vec<InputMessage>,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<Reasoning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<TextOptions>,
}

#[derive(Debug, Serialize)]
struct InputMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct Reasoning {
    effort: String,
}

#[derive(Debug, Serialize)]
struct TextOptions {
    verbosity: String,
}

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type", default)]
    item_type: String,
    #[serde(default)]
    content: Vec<ContentChunk>,
}

#[derive(Debug, Deserialize)]
struct ContentChunk {
    #[serde(rename = "type", default)]
    chunk_type: String,
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::default()
    }

    fn backend(settings: &Settings) -> OpenAiBackend {
        OpenAiBackend::new("sk-test".to_string(), settings).unwrap()
    }

    fn context() -> CommitContext {
        CommitContext {
            staged_files: vec!["src/main.rs".to_string()],
            name_status: "M\tsrc/main.rs".to_string(),
            diff_stat: " src/main.rs | 2 +-".to_string(),
            diff: cmtr_core::DiffContext::default(),
            log: cmtr_core::LogSample::default(),
            has_history: true,
        }
    }

    #[test]
    fn test_request_carries_model_and_tuning() {
        let settings = settings();
        let request = backend(&settings).build_request(&context(), &settings);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-5.2");
        assert_eq!(json["max_output_tokens"], 200);
        assert_eq!(json["input"][0]["role"], "system");
        assert_eq!(json["input"][1]["role"], "user");
        assert_eq!(json["reasoning"]["effort"], "none");
        assert_eq!(json["text"]["verbosity"], "low");
    }

    #[test]
    fn test_empty_tuning_fields_are_omitted() {
        let mut settings = settings();
        settings.reasoning_effort = String::new();
        settings.text_verbosity = String::new();

        let request = backend(&settings).build_request(&context(), &settings);
        let json = serde_json::to_value(&request).unwrap();

        assert!(json.get("reasoning").is_none());
        assert!(json.get("text").is_none());
    }

    #[test]
    fn test_endpoint_normalizes_trailing_slash() {
        let mut settings = settings();
        settings.base_url = Some("https://proxy.internal/v1/".to_string());
        assert_eq!(
            backend(&settings).endpoint(),
            "https://proxy.internal/v1/responses"
        );

        let settings = self::settings();
        assert_eq!(
            backend(&settings).endpoint(),
            "https://api.openai.com/v1/responses"
        );
    }

    #[test]
    fn test_extract_prefers_output_text() {
        let reply: ResponsesReply = serde_json::from_str(
            r#"{"output_text": "Fix typo", "output": [{"type": "message", "content": [{"type": "output_text", "text": "ignored"}]}]}"#,
        )
        .unwrap();
        assert_eq!(extract_output_text(&reply), "Fix typo");
    }

    #[test]
    fn test_extract_joins_message_chunks() {
        let reply: ResponsesReply = serde_json::from_str(
            r#"{
                "output": [
                    {"type": "reasoning", "content": [{"type": "text", "text": "skip me"}]},
                    {"type": "message", "content": [
                        {"type": "output_text", "text": "Fix parser"},
                        {"type": "refusal", "text": "skip me too"},
                        {"type": "text", "text": " edge case"}
                    ]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(extract_output_text(&reply), "Fix parser edge case");
    }

    #[test]
    fn test_extract_empty_reply() {
        let reply: ResponsesReply = serde_json::from_str(r#"{"output": []}"#).unwrap();
        assert_eq!(extract_output_text(&reply), "");

        let reply: ResponsesReply = serde_json::from_str(r#"{"output_text": "  "}"#).unwrap();
        assert_eq!(extract_output_text(&reply), "");
    }
}
