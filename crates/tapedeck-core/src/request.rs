//! Typed request bodies for the endpoints Tapedeck records

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Value,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Value::String(content.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingsRequest {
    pub model: String,
    pub input: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    pub model: String,
    pub prompt: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a request that can be sent for a cassette
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Chat(ChatCompletionRequest),
    Completion(CompletionRequest),
    Embeddings(EmbeddingsRequest),
    ImageGeneration(ImageGenerationRequest),
}

impl RequestBody {
    pub fn model(&self) -> &str {
        match self {
            RequestBody::Chat(r) => &r.model,
            RequestBody::Completion(r) => &r.model,
            RequestBody::Embeddings(r) => &r.model,
            RequestBody::ImageGeneration(r) => &r.model,
        }
    }

    /// Endpoint path relative to the API root
    pub fn endpoint(&self) -> &'static str {
        match self {
            RequestBody::Chat(_) => "/chat/completions",
            RequestBody::Completion(_) => "/completions",
            RequestBody::Embeddings(_) => "/embeddings",
            RequestBody::ImageGeneration(_) => "/images/generations",
        }
    }

    pub fn is_streaming(&self) -> bool {
        match self {
            RequestBody::Chat(r) => r.stream.unwrap_or(false),
            RequestBody::Completion(r) => r.stream.unwrap_or(false),
            _ => false,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        let bytes = match self {
            RequestBody::Chat(r) => serde_json::to_vec(r)?,
            RequestBody::Completion(r) => serde_json::to_vec(r)?,
            RequestBody::Embeddings(r) => serde_json::to_vec(r)?,
            RequestBody::ImageGeneration(r) => serde_json::to_vec(r)?,
        };
        Ok(bytes)
    }
}

/// Read the `model` field from a JSON request body
pub fn extract_model(body: &[u8]) -> Result<String> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| Error::ModelExtraction(format!("invalid JSON: {}", e)))?;
    match value.get("model") {
        Some(Value::String(model)) if !model.is_empty() => Ok(model.clone()),
        Some(Value::String(_)) => Err(Error::ModelExtraction("model is empty".to_string())),
        Some(_) => Err(Error::ModelExtraction("model is not a string".to_string())),
        None => Err(Error::ModelExtraction("model is missing".to_string())),
    }
}
