//! External service client trait and endpoint identities

use gemforge_core::ServiceError;
use serde_json::Value;
use std::fmt;

/// One remote operation a provider exposes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Single-turn chat completion (text provider)
    ChatCompletion,
    /// Text-to-image (image provider)
    ImageGeneration,
    /// Start an image-to-3D session (reconstruction provider)
    ImageToMesh,
    /// Look up an existing reconstruction session by its code
    MeshSession(String),
}

impl Endpoint {
    /// Stable name, used for logging and for scripting mock responses
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::ChatCompletion => "chat_completion",
            Endpoint::ImageGeneration => "image_generation",
            Endpoint::ImageToMesh => "image_to_mesh",
            Endpoint::MeshSession(_) => "mesh_session",
        }
    }

    /// Path relative to the provider's base URL
    pub fn path(&self) -> String {
        match self {
            Endpoint::ChatCompletion => "/chat/completions".to_string(),
            Endpoint::ImageGeneration => "/images/generations".to_string(),
            Endpoint::ImageToMesh => "/image-to-3d-sessions".to_string(),
            Endpoint::MeshSession(code) => format!("/image-to-3d-sessions/{}", code),
        }
    }

    /// Lookups are GETs; everything else posts a JSON payload
    pub fn is_lookup(&self) -> bool {
        matches!(self, Endpoint::MeshSession(_))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Uniform call wrapper around one remote generation provider.
///
/// Implementations make exactly one outbound request per call and never
/// retry; every provider fault comes back as a `ServiceError`.
pub trait ServiceClient: Send + Sync {
    /// Provider name (e.g. "openai", "csm", "mock")
    fn name(&self) -> &str;

    /// Send `payload` to `endpoint` and return the parsed JSON body
    fn call(&self, endpoint: &Endpoint, payload: &Value) -> Result<Value, ServiceError>;

    /// Fetch the raw bytes behind a locator reported by the provider
    fn download(&self, locator: &str) -> Result<Vec<u8>, ServiceError>;
}

/// Read a string field from a response, looking at the top level first and
/// then inside a `data` object (CSM wraps its payload that way).
///
/// Empty strings count as absent; CSM reports fields that are not ready yet
/// that way.
pub(crate) fn lookup_str<'a>(response: &'a Value, key: &str) -> Option<&'a str> {
    let present = |v: &'a Value| v.as_str().filter(|s| !s.is_empty());
    response
        .get(key)
        .and_then(present)
        .or_else(|| response.get("data").and_then(|d| d.get(key)).and_then(present))
}
