//! Prompt expansion via the text-generation provider

use crate::client::{Endpoint, ServiceClient};
use crate::design::{DesignRequest, GenerationResult};
use gemforge_core::{Result, ServiceError};
use serde_json::{json, Value};
use std::sync::Arc;

/// Turns a design request into a detailed image-generation prompt
pub struct PromptExpander {
    client: Arc<dyn ServiceClient>,
    model: String,
    temperature: f64,
}

impl PromptExpander {
    pub fn new(client: Arc<dyn ServiceClient>, model: &str, temperature: f64) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature,
        }
    }

    /// The chat completion payload for a request
    pub fn build_payload(&self, request: &DesignRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": request.combined_prompt() }],
            "temperature": self.temperature
        })
    }

    /// Expand the request into prompt text.
    ///
    /// An empty raw prompt is sent as-is; the provider decides whether it is acceptable.
    pub fn expand(&self, request: &DesignRequest) -> Result<String> {
        let response = self
            .client
            .call(&Endpoint::ChatCompletion, &self.build_payload(request))?;
        Ok(parse_chat_response(&response)?.into_inner())
    }
}

/// Extract `choices[0].message.content` from a chat completion response
pub fn parse_chat_response(response: &Value) -> Result<GenerationResult> {
    let content = response
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| {
            ServiceError::malformed("chat completion response has no choices[0].message.content")
        })?;
    GenerationResult::text(content)
}
