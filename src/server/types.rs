//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::engine::{GenerateOptions, GenerateParameters};
use crate::models::ModelManifest;

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: Option<i64>,
    pub temperature: Option<f64>,
    pub top_k: Option<i64>,
    pub top_p: Option<f64>,
    pub stream: bool,
}

impl GenerateRequest {
    /// Defaults, overridden by each request field that is present and > 0.
    pub fn options(&self) -> GenerateOptions {
        let mut params = GenerateParameters::default();
        if let Some(v) = positive_int(self.max_tokens) {
            params.max_tokens = v;
        }
        if let Some(v) = self.temperature.filter(|v| *v > 0.0) {
            params.temperature = v as f32;
        }
        if let Some(v) = positive_int(self.top_k) {
            params.top_k = v;
        }
        if let Some(v) = self.top_p.filter(|v| *v > 0.0) {
            params.top_p = v as f32;
        }
        GenerateOptions::new(params)
    }
}

fn positive_int(value: Option<i64>) -> Option<u32> {
    value
        .filter(|v| *v > 0)
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
}

/// Body of a full-text generate response, and of each streamed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub model: String,
    pub response: String,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

/// Body of a full-text chat response, and of each streamed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub model: String,
    pub message: ChatMessage,
    pub done: bool,
}

/// Flatten a conversation into a single prompt.
///
/// Each message becomes `"<Role>: <content>\n"` and the prompt ends with
/// `"Assistant: "` so the model continues as the assistant.
pub fn flatten_messages(messages: &[ChatMessage]) -> String {
    let mut prompt = String::new();
    for message in messages {
        match message.role.as_str() {
            "system" => prompt.push_str("System: "),
            "user" => prompt.push_str("User: "),
            "assistant" => prompt.push_str("Assistant: "),
            other => {
                prompt.push_str(other);
                prompt.push_str(": ");
            }
        }
        prompt.push_str(&message.content);
        prompt.push('\n');
    }
    prompt.push_str("Assistant: ");
    prompt
}

/// One entry of `GET /api/tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization: Option<String>,
}

impl From<ModelManifest> for ModelInfo {
    fn from(manifest: ModelManifest) -> Self {
        Self {
            name: manifest.name,
            size: manifest.size,
            architecture: manifest.architecture,
            quantization: manifest.quantization,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    pub models: Vec<ModelInfo>,
}

/// Body of `DELETE /api/delete`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeleteRequest {
    pub name: String,
}

/// JSON error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
