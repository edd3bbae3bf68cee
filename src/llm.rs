//! Text-completion client.
//!
//! The tutor only needs "messages in, one string out", so the seam is the
//! [`CompletionService`] trait. [`OpenAiClient`] speaks the OpenAI-compatible
//! `/chat/completions` endpoint over a blocking `ureq` agent.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = concat!("eisaku/", env!("CARGO_PKG_VERSION"));
// Error bodies are only kept for diagnostics.
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("could not decode reply: {0}")]
    Decode(String),
    #[error("reply contained no message")]
    EmptyReply,
}

pub trait CompletionService {
    /// Sends the messages in order and returns the trimmed completion text.
    fn complete(&self, messages: &[Message], temperature: f32) -> Result<String, CompletionError>;
}

#[derive(Clone)]
pub struct OpenAiClient {
    agent: ureq::Agent,
    api_key: String,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: &str, model: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(REQUEST_TIMEOUT)
            .timeout_read(REQUEST_TIMEOUT)
            .timeout_write(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            api_key: api_key.to_string(),
            endpoint: chat_endpoint(base_url),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionService for OpenAiClient {
    fn complete(&self, messages: &[Message], temperature: f32) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: clamp_temperature(temperature),
            messages,
        };

        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            temperature = request.temperature,
            "sending completion request"
        );

        let response = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Accept", "application/json")
            .send_json(&request)
            .map_err(completion_error_from_ureq)?;

        let body: ChatResponse = response
            .into_json()
            .map_err(|e| CompletionError::Decode(e.to_string()))?;
        first_choice_text(body)
    }
}

fn chat_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn clamp_temperature(temperature: f32) -> f32 {
    if temperature.is_nan() {
        0.0
    } else {
        temperature.clamp(0.0, 1.0)
    }
}

fn first_choice_text(body: ChatResponse) -> Result<String, CompletionError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or(CompletionError::EmptyReply)
}

fn completion_error_from_ureq(err: ureq::Error) -> CompletionError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response
                .into_string()
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            CompletionError::Status { status, body }
        }
        ureq::Error::Transport(transport) => CompletionError::Transport(transport.to_string()),
    }
}
