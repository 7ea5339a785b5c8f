//! Image synthesis via the image-generation provider

use crate::client::{Endpoint, ServiceClient};
use crate::design::GenerationResult;
use gemforge_core::{Result, ServiceError};
use serde_json::{json, Value};
use std::sync::Arc;

/// Fixed parameters for every image request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageParams {
    pub model: String,
    /// Square size spec, e.g. "1024x1024"
    pub size: String,
    pub quality: String,
}

impl Default for ImageParams {
    fn default() -> Self {
        Self {
            model: "dall-e-3".to_string(),
            size: "1024x1024".to_string(),
            quality: "standard".to_string(),
        }
    }
}

/// Renders a single image from a text prompt
pub struct ImageSynthesizer {
    client: Arc<dyn ServiceClient>,
    params: ImageParams,
}

impl ImageSynthesizer {
    pub fn new(client: Arc<dyn ServiceClient>, params: ImageParams) -> Self {
        Self { client, params }
    }

    pub fn build_payload(&self, prompt: &str) -> Value {
        json!({
            "model": self.params.model,
            "prompt": prompt,
            "size": self.params.size,
            "quality": self.params.quality,
            "n": 1
        })
    }

    /// Render `prompt` and return the image locator.
    ///
    /// No local check on the prompt: an empty one goes to the provider.
    pub fn synthesize(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .call(&Endpoint::ImageGeneration, &self.build_payload(prompt))?;
        Ok(parse_image_response(&response)?.into_inner())
    }
}

/// Extract `data[0].url` from an image generation response
pub fn parse_image_response(response: &Value) -> Result<GenerationResult> {
    let url = response
        .pointer("/data/0/url")
        .and_then(|u| u.as_str())
        .ok_or_else(|| ServiceError::malformed("image response has no data[0].url"))?;
    GenerationResult::locator(url)
}
