use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::{
    ChatRequest, FunctionCall, FunctionDeclaration, FunctionResponse, LlmClient, LlmError,
    ModelReply, Turn,
};
use crate::config::LlmConfig;

// ---- wire types (generateContent) ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool<'a> {
    function_declarations: &'a [FunctionDeclaration],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiApiError,
}

#[derive(Debug, Deserialize)]
struct GeminiApiError {
    message: String,
}

/// Google Gemini `generateContent` client with function calling.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(client: Client, cfg: &LlmConfig) -> Self {
        Self {
            client,
            api_key: cfg.api_key.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
        }
    }

    fn build_request<'a>(
        request: &ChatRequest,
        tools: &'a [FunctionDeclaration],
    ) -> GeminiRequest<'a> {
        let contents = request.turns.iter().map(to_content).collect();
        let system_instruction = request.system.as_ref().map(|s| GeminiContent {
            role: None,
            parts: vec![Part::Text { text: s.clone() }],
        });
        let tools = if tools.is_empty() {
            Vec::new()
        } else {
            vec![GeminiTool {
                function_declarations: tools,
            }]
        };
        GeminiRequest {
            contents,
            system_instruction,
            tools,
            generation_config: request
                .temperature
                .map(|temperature| GenerationConfig { temperature }),
        }
    }
}

fn to_content(turn: &Turn) -> GeminiContent {
    match turn {
        Turn::User(text) => GeminiContent {
            role: Some("user".into()),
            parts: vec![Part::Text { text: text.clone() }],
        },
        Turn::FunctionCalls(calls) => GeminiContent {
            role: Some("model".into()),
            parts: calls
                .iter()
                .cloned()
                .map(|function_call| Part::FunctionCall { function_call })
                .collect(),
        },
        Turn::FunctionResponses(responses) => GeminiContent {
            role: Some("user".into()),
            parts: responses
                .iter()
                .cloned()
                .map(|function_response| Part::FunctionResponse { function_response })
                .collect(),
        },
    }
}

/// Function calls win over text: a turn that asks for tools is not final.
fn into_reply(response: GeminiResponse) -> Result<ModelReply, LlmError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(LlmError::EmptyResponse("no candidates".into()));
    };
    let finish_reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

    let mut calls = Vec::new();
    let mut text = String::new();
    for part in parts {
        match part {
            Part::FunctionCall { function_call } => calls.push(function_call),
            Part::Text { text: t } => text.push_str(&t),
            Part::FunctionResponse { .. } => {}
        }
    }

    if !calls.is_empty() {
        return Ok(ModelReply::FunctionCalls(calls));
    }
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse(finish_reason));
    }
    Ok(ModelReply::Text(text))
}

#[async_trait]
impl LlmClient for GeminiClient {
    #[instrument(skip(self, request, tools), fields(model = %self.model, turns = request.turns.len()))]
    async fn complete_with_tools(
        &self,
        request: &ChatRequest,
        tools: &[FunctionDeclaration],
    ) -> Result<ModelReply, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = Self::build_request(request, tools);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            error!(%status, "gemini API error");
            let message = serde_json::from_str::<GeminiErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GeminiResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::ParseError(e.to_string()))?;
        let reply = into_reply(parsed)?;
        debug!(tool_calls = matches!(reply, ModelReply::FunctionCalls(_)), "gemini replied");
        Ok(reply)
    }
}
