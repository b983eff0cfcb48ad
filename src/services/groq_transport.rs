//! Chat-completion transport for the model API.
//!
//! Services talk to the model through [`ChatTransport`] so tests can swap in
//! a scripted implementation.

use async_trait::async_trait;
use log::debug;
use regex::Regex;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::config::GroqConfig;
use crate::models::chat::{ChatMessage, ChatRequest, ChatResponse};

#[derive(Debug)]
pub enum ChatError {
    EnvironmentError(String),
    HttpError(reqwest::Error),
    ResponseError(String),
    EmptyResponse,
    InvalidJson(String),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::EnvironmentError(msg) => write!(f, "Environment error: {}", msg),
            ChatError::HttpError(err) => write!(f, "HTTP error: {}", err),
            ChatError::ResponseError(msg) => write!(f, "Response error: {}", msg),
            ChatError::EmptyResponse => write!(f, "Model returned no content"),
            ChatError::InvalidJson(msg) => write!(f, "Model returned invalid JSON: {}", msg),
        }
    }
}

impl std::error::Error for ChatError {}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::HttpError(err)
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError>;

    /// Text of the first choice, or [`ChatError::EmptyResponse`].
    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let response = self.chat(request).await?;
        if response.finish_reason() == Some("length") {
            debug!("Model output hit the token limit");
        }
        response
            .content()
            .map(str::to_string)
            .ok_or(ChatError::EmptyResponse)
    }

    async fn complete_json(&self, request: &ChatRequest) -> Result<Value, ChatError> {
        let content = self.complete(request).await?;
        extract_json(&content)
    }
}

#[async_trait]
impl ChatTransport for Arc<dyn ChatTransport> {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        (**self).chat(request).await
    }
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

pub struct GroqTransport {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl GroqTransport {
    pub fn new(config: &GroqConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl ChatTransport for GroqTransport {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ChatError::EnvironmentError("GROQ_API_KEY not set".to_string()))?;

        let body = CompletionBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request
                .json_mode
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ChatError::ResponseError(format!(
                "Chat completion failed with status {}: {}",
                status, error_text
            )));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ChatError::ResponseError(format!("Failed to parse completion: {}", e)))
    }
}

/// Parses model output as JSON, tolerating markdown fences and chatter
/// around the object.
pub fn extract_json(content: &str) -> Result<Value, ChatError> {
    let trimmed = content.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let fenced = Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```")
        .ok()
        .and_then(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());
    if let Some(inner) = fenced {
        if let Ok(value) = serde_json::from_str::<Value>(inner) {
            return Ok(value);
        }
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&trimmed[start..=end])
            .map_err(|e| ChatError::InvalidJson(e.to_string())),
        _ => Err(ChatError::InvalidJson(format!(
            "no JSON object in {} characters of output",
            trimmed.chars().count()
        ))),
    }
}
