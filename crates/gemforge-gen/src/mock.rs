//! Mock service client for testing and offline runs
//!
//! Answers every endpoint without any network calls. Responses can be
//! scripted per endpoint; unscripted endpoints get a canned success, and
//! `mock://` locators download as a minimal valid GLB.

use crate::client::{Endpoint, ServiceClient};
use gemforge_core::{ServiceError, ServiceErrorKind};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

type Scripted = Result<Value, ServiceError>;

/// A scriptable in-process stand-in for the remote providers
#[derive(Default)]
pub struct MockServiceClient {
    /// Per-endpoint queues; the last entry sticks once the others are consumed
    responses: Mutex<HashMap<&'static str, VecDeque<Scripted>>>,
    downloads: Mutex<HashMap<String, Vec<u8>>>,
    history: Mutex<Vec<(String, Value)>>,
    calls: AtomicUsize,
}

impl MockServiceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response body for an endpoint
    pub fn respond(&self, endpoint: &Endpoint, body: Value) -> &Self {
        self.push(endpoint, Ok(body))
    }

    /// Queue a failure for an endpoint
    pub fn fail(&self, endpoint: &Endpoint, kind: ServiceErrorKind, message: &str) -> &Self {
        self.push(endpoint, Err(ServiceError::new(kind, message)))
    }

    /// Register bytes served for a download locator
    pub fn serve(&self, locator: &str, bytes: Vec<u8>) -> &Self {
        lock(&self.downloads).insert(locator.to_string(), bytes);
        self
    }

    /// Total outbound operations (calls and downloads)
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of calls made to one endpoint
    pub fn calls_to(&self, endpoint: &Endpoint) -> usize {
        lock(&self.history)
            .iter()
            .filter(|(name, _)| name == endpoint.name())
            .count()
    }

    /// Payload of the most recent call to an endpoint
    pub fn last_payload(&self, endpoint: &Endpoint) -> Option<Value> {
        lock(&self.history)
            .iter()
            .rev()
            .find(|(name, _)| name == endpoint.name())
            .map(|(_, payload)| payload.clone())
    }

    fn push(&self, endpoint: &Endpoint, response: Scripted) -> &Self {
        lock(&self.responses)
            .entry(endpoint.name())
            .or_default()
            .push_back(response);
        self
    }

    fn next_scripted(&self, endpoint: &Endpoint) -> Option<Scripted> {
        let mut responses = lock(&self.responses);
        let queue = responses.get_mut(endpoint.name())?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl ServiceClient for MockServiceClient {
    fn name(&self) -> &str {
        "mock"
    }

    fn call(&self, endpoint: &Endpoint, payload: &Value) -> Result<Value, ServiceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.history).push((endpoint.name().to_string(), payload.clone()));
        tracing::debug!(%endpoint, call = n, "mock call");

        match self.next_scripted(endpoint) {
            Some(scripted) => scripted,
            None => Ok(canned_response(endpoint, payload, n)),
        }
    }

    fn download(&self, locator: &str) -> Result<Vec<u8>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(bytes) = lock(&self.downloads).get(locator) {
            return Ok(bytes.clone());
        }
        if locator.starts_with("mock://") {
            return Ok(minimal_glb());
        }
        Err(ServiceError::new(
            ServiceErrorKind::InvalidRequest,
            format!("mock has nothing to serve at '{}'", locator),
        ))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn canned_response(endpoint: &Endpoint, payload: &Value, n: usize) -> Value {
    match endpoint {
        Endpoint::ChatCompletion => {
            let prompt = payload
                .pointer("/messages/0/content")
                .and_then(|c| c.as_str())
                .unwrap_or_default();
            json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": format!("A studio product photograph of {}", prompt.trim())
                    }
                }]
            })
        }
        Endpoint::ImageGeneration => json!({
            "data": [{ "url": format!("mock://images/{}.png", n) }]
        }),
        Endpoint::ImageToMesh => json!({
            "data": {
                "session_code": format!("SESSION_MOCK_{}", n),
                "status": "spin_generate_processing"
            }
        }),
        Endpoint::MeshSession(code) => json!({
            "data": {
                "session_code": code,
                "status": "complete",
                "mesh_url_glb": format!("mock://meshes/{}.glb", code),
                "spin_url": format!("mock://spins/{}.mp4", code)
            }
        }),
    }
}

/// A minimal valid glTF 2.0 binary holding a single triangle
pub fn minimal_glb() -> Vec<u8> {
    let json = json!({
        "asset": { "version": "2.0", "generator": "gemforge-mock" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{
            "primitives": [{
                "attributes": { "POSITION": 0 },
                "indices": 1
            }]
        }],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "max": [1.0, 1.0, 0.0],
                "min": [-1.0, 0.0, 0.0]
            },
            {
                "bufferView": 1,
                "componentType": 5123,
                "count": 3,
                "type": "SCALAR",
                "max": [2],
                "min": [0]
            }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }
        ],
        "buffers": [{ "byteLength": 44 }]
    });

    let mut json_chunk = json.to_string().into_bytes();
    json_chunk.resize((json_chunk.len() + 3) & !3, b' ');

    let vertices: [f32; 9] = [-1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let indices: [u16; 3] = [0, 1, 2];
    let mut bin_chunk = Vec::with_capacity(44);
    for v in &vertices {
        bin_chunk.extend_from_slice(&v.to_le_bytes());
    }
    for i in &indices {
        bin_chunk.extend_from_slice(&i.to_le_bytes());
    }
    bin_chunk.resize((bin_chunk.len() + 3) & !3, 0);

    let total_len = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();
    let mut glb = Vec::with_capacity(total_len);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total_len as u32).to_le_bytes());
    glb.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes()); // "JSON"
    glb.extend_from_slice(&json_chunk);
    glb.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
    glb.extend_from_slice(&0x004E4942u32.to_le_bytes()); // "BIN\0"
    glb.extend_from_slice(&bin_chunk);
    glb
}
