use serde::{Deserialize, Serialize};

use super::types::LlmClient;
use super::StructuringError;

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";
const MAX_TOKENS: u32 = 4000;

/// Anthropic Messages API client (blocking).
pub struct AnthropicClient {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl AnthropicClient {
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, StructuringError> {
        if api_key.trim().is_empty() {
            return Err(StructuringError::MissingApiKey);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StructuringError::HttpClient(e.to_string()))?;

        Ok(Self {
            endpoint: ANTHROPIC_API_URL.to_string(),
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }

    /// Point at a different Messages endpoint (proxies, tests).
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Request body for POST /v1/messages
#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response body from POST /v1/messages
#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Concatenated text blocks of a Messages response.
fn response_text(response: MessagesResponse) -> Result<String, StructuringError> {
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();
    if text.trim().is_empty() {
        return Err(StructuringError::ResponseParsing(
            "response contained no text content".into(),
        ));
    }
    Ok(text)
}

impl LlmClient for AnthropicClient {
    fn complete(&self, system: &str, prompt: &str) -> Result<String, StructuringError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
            system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    StructuringError::ApiConnection(self.endpoint.clone())
                } else if e.is_timeout() {
                    StructuringError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    StructuringError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StructuringError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .map_err(|e| StructuringError::ResponseParsing(e.to_string()))?;

        tracing::debug!(model = %self.model, "Model response received");
        response_text(parsed)
    }
}

/// Mock LLM client for testing: returns a configurable response.
///
/// Rules are checked in order against the prompt; the first whose needle
/// appears in the prompt answers. Otherwise the default response is used.
pub struct MockLlmClient {
    response: String,
    rules: Vec<(String, Result<String, String>)>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            rules: Vec::new(),
        }
    }

    pub fn when_prompt_contains(mut self, needle: &str, response: &str) -> Self {
        self.rules.push((needle.to_string(), Ok(response.to_string())));
        self
    }

    pub fn fail_when_prompt_contains(mut self, needle: &str, reason: &str) -> Self {
        self.rules.push((needle.to_string(), Err(reason.to_string())));
        self
    }
}

impl LlmClient for MockLlmClient {
    fn complete(&self, _system: &str, prompt: &str) -> Result<String, StructuringError> {
        for (needle, outcome) in &self.rules {
            if prompt.contains(needle.as_str()) {
                return outcome.clone().map_err(StructuringError::HttpClient);
            }
        }
        Ok(self.response.clone())
    }
}
