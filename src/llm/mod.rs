//! Model provider abstraction for tool-augmented chat.
//!
//! A conversation is a list of [`Turn`]s. Each call to
//! [`LlmClient::complete_with_tools`] returns either a batch of function calls
//! the caller must execute and feed back, or the model's final text.

mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },
    #[error("failed to parse model response: {0}")]
    ParseError(String),
    #[error("model returned no content (finish reason: {0})")]
    EmptyResponse(String),
}

/// Function call made by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// Result of executing a [`FunctionCall`], sent back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

/// Tool the model is allowed to call. `parameters` is a JSON schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    User(String),
    FunctionCalls(Vec<FunctionCall>),
    FunctionResponses(Vec<FunctionResponse>),
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub turns: Vec<Turn>,
    pub temperature: Option<f32>,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            turns: Vec::new(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }
}

/// What the model decided to do this turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    FunctionCalls(Vec<FunctionCall>),
    Text(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete_with_tools(
        &self,
        request: &ChatRequest,
        tools: &[FunctionDeclaration],
    ) -> Result<ModelReply, LlmError>;
}
