//! Mesh generation via the 3D-reconstruction provider
//!
//! A successful submit only yields a session. The mesh file itself shows up
//! later: either the provider reports a local `mesh_path`, or a remote mesh
//! URL appears on a later session lookup (`refresh`).

use crate::client::{lookup_str, Endpoint, ServiceClient};
use gemforge_core::{GemforgeError, Result, ServiceError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// One reconstruction job as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshSession {
    /// Opaque provider handle, never empty
    pub session_code: String,
    /// Local mesh file, once known
    #[serde(default)]
    pub mesh_path: Option<String>,
    /// Remote mesh reference, once the provider exposes one
    #[serde(default)]
    pub mesh_url: Option<String>,
    #[serde(default)]
    pub spin_video_url: Option<String>,
    /// Provider status string, if reported
    #[serde(default)]
    pub status: Option<String>,
    /// Last raw provider body, kept for diagnostics only
    #[serde(skip)]
    pub raw_response: Value,
}

impl MeshSession {
    /// Build a session from a provider response.
    ///
    /// Fails with `SessionCodeMissing` when the response carries no usable
    /// session identifier, even though the call itself succeeded.
    pub fn from_response(response: Value, mesh_format: &str) -> Result<Self> {
        Self::parse(response, mesh_format, None)
    }

    /// Like `from_response`, but a lookup that omits the code still
    /// describes the session it was asked about.
    fn parse(response: Value, mesh_format: &str, known_code: Option<&str>) -> Result<Self> {
        let session_code = lookup_str(&response, "session_code")
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or(known_code)
            .ok_or(GemforgeError::SessionCodeMissing)?
            .to_string();

        let format_key = format!("mesh_url_{}", mesh_format);
        let mesh_url = first_of(&response, &[format_key.as_str(), "mesh_url"]);

        Ok(Self {
            session_code,
            mesh_path: first_of(&response, &["mesh_path"]),
            mesh_url,
            spin_video_url: first_of(&response, &["spin_url", "spin_video_url"]),
            status: first_of(&response, &["status"]),
            raw_response: response,
        })
    }

    /// Fold a newer view of the same session into this one.
    ///
    /// Known references are only replaced, never dropped.
    pub fn merge(&self, newer: MeshSession) -> MeshSession {
        MeshSession {
            session_code: self.session_code.clone(),
            mesh_path: newer.mesh_path.or_else(|| self.mesh_path.clone()),
            mesh_url: newer.mesh_url.or_else(|| self.mesh_url.clone()),
            spin_video_url: newer.spin_video_url.or_else(|| self.spin_video_url.clone()),
            status: newer.status.or_else(|| self.status.clone()),
            raw_response: newer.raw_response,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.session_code.trim().is_empty()
    }
}

/// First key, in order, that carries a non-empty string
fn first_of(response: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| lookup_str(response, key))
        .map(str::to_string)
}

/// Submits images for 3D reconstruction
pub struct MeshGenerator {
    client: Arc<dyn ServiceClient>,
    mesh_format: String,
    spin_video: bool,
}

impl MeshGenerator {
    pub fn new(client: Arc<dyn ServiceClient>, mesh_format: &str, spin_video: bool) -> Self {
        Self {
            client,
            mesh_format: mesh_format.to_string(),
            spin_video,
        }
    }

    pub fn mesh_format(&self) -> &str {
        &self.mesh_format
    }

    pub fn build_payload(&self, image_locator: &str) -> Value {
        json!({
            "image_url": image_locator,
            "generate_spin_video": self.spin_video,
            "mesh_format": self.mesh_format
        })
    }

    /// Start a reconstruction session for an image
    pub fn generate(&self, image_locator: &str) -> Result<MeshSession> {
        let response = self
            .client
            .call(&Endpoint::ImageToMesh, &self.build_payload(image_locator))?;
        let session = MeshSession::from_response(response, &self.mesh_format)?;
        tracing::info!(
            session_code = %session.session_code,
            mesh_ready = session.mesh_path.is_some() || session.mesh_url.is_some(),
            "mesh session created"
        );
        Ok(session)
    }

    /// Look the session up once and merge whatever the provider now reports
    pub fn refresh(&self, session: &MeshSession) -> Result<MeshSession> {
        if !session.is_valid() {
            return Err(GemforgeError::SessionCodeMissing);
        }
        let endpoint = Endpoint::MeshSession(session.session_code.clone());
        let response = self.client.call(&endpoint, &Value::Null)?;
        let newer = MeshSession::parse(response, &self.mesh_format, Some(&session.session_code))?;
        tracing::debug!(
            session_code = %session.session_code,
            status = newer.status.as_deref().unwrap_or("unknown"),
            "mesh session refreshed"
        );
        Ok(session.merge(newer))
    }

    /// Fetch the bytes of a remote mesh reference
    pub fn download(&self, mesh_url: &str) -> Result<Vec<u8>> {
        let bytes = self.client.download(mesh_url)?;
        if bytes.is_empty() {
            return Err(ServiceError::malformed(format!("mesh download from {} was empty", mesh_url)).into());
        }
        Ok(bytes)
    }
}
