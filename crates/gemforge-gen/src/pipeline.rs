//! Pipeline orchestrator
//!
//! Sequences prompt expansion, image synthesis and mesh generation for one
//! design run. Each stage is a single synchronous call the caller triggers;
//! nothing is retried or polled here. Failed stages leave earlier results
//! in place so a retry never repeats work that already succeeded.
//!
//! Redoing prompt expansion or image synthesis never moves the stage
//! backwards. Mesh requests and artifact checks always record their own
//! outcome, because they describe the current session.

use crate::client::ServiceClient;
use crate::config::GemforgeConfig;
use crate::design::{resolve_override, DesignRequest};
use crate::expander::PromptExpander;
use crate::http::HttpServiceClient;
use crate::mesh::{MeshGenerator, MeshSession};
use crate::mock::MockServiceClient;
use crate::run::PipelineRun;
use crate::store::{ArtifactStore, StoredArtifact};
use crate::synthesizer::{ImageParams, ImageSynthesizer};
use gemforge_core::{GemforgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where a run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    PromptExpanded,
    ImageReady,
    MeshRequested,
    MeshReady,
    MeshFailed,
    ArtifactVerified,
    ArtifactMissing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::PromptExpanded => "prompt expanded",
            Stage::ImageReady => "image ready",
            Stage::MeshRequested => "mesh requested",
            Stage::MeshReady => "mesh ready",
            Stage::MeshFailed => "mesh failed",
            Stage::ArtifactVerified => "artifact verified",
            Stage::ArtifactMissing => "artifact missing",
        };
        write!(f, "{}", s)
    }
}

impl Stage {
    /// Position in the stage sequence; outcomes of the same step share one
    fn rank(self) -> u8 {
        match self {
            Stage::Idle => 0,
            Stage::PromptExpanded => 1,
            Stage::ImageReady => 2,
            Stage::MeshRequested => 3,
            Stage::MeshReady | Stage::MeshFailed => 4,
            Stage::ArtifactVerified | Stage::ArtifactMissing => 5,
        }
    }
}

/// Results carried from one stage to the next.
///
/// A field is only ever replaced by a fresh success of its own stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    #[serde(default)]
    pub expanded_prompt: Option<String>,
    #[serde(default)]
    pub image_locator: Option<String>,
    #[serde(default)]
    pub mesh_session: Option<MeshSession>,
    #[serde(default)]
    pub artifact: Option<StoredArtifact>,
}

/// What a fully successful run hands to download/visualization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub session_code: String,
    pub mesh_path: String,
    pub artifact: StoredArtifact,
}

/// Stage wrappers and storage, built once per process and shared by runs
pub struct Services {
    pub expander: PromptExpander,
    pub synthesizer: ImageSynthesizer,
    pub mesh_generator: MeshGenerator,
    pub store: ArtifactStore,
}

impl Services {
    /// Wire the stages onto explicit clients
    pub fn with_clients(
        text_client: Arc<dyn ServiceClient>,
        mesh_client: Arc<dyn ServiceClient>,
        config: &GemforgeConfig,
        store: ArtifactStore,
    ) -> Self {
        let gen = &config.generation;
        Self {
            expander: PromptExpander::new(text_client.clone(), &gen.text_model, gen.temperature),
            synthesizer: ImageSynthesizer::new(
                text_client,
                ImageParams {
                    model: gen.image_model.clone(),
                    size: gen.image_size.clone(),
                    quality: gen.image_quality.clone(),
                },
            ),
            mesh_generator: MeshGenerator::new(mesh_client, &gen.mesh_format, gen.spin_video),
            store,
        }
    }

    /// Build services for a backend set by name ("openai" or "mock")
    pub fn from_config(config: &GemforgeConfig, provider: &str) -> Result<Self> {
        let store = ArtifactStore::new(&config.store.root);
        match provider {
            "openai" => {
                let text: Arc<dyn ServiceClient> =
                    Arc::new(HttpServiceClient::from_config("openai", config)?);
                let mesh: Arc<dyn ServiceClient> =
                    Arc::new(HttpServiceClient::from_config("csm", config)?);
                Ok(Self::with_clients(text, mesh, config, store))
            }
            "mock" => {
                let mock: Arc<dyn ServiceClient> = Arc::new(MockServiceClient::new());
                Ok(Self::with_clients(mock.clone(), mock, config, store))
            }
            _ => Err(GemforgeError::ConfigError(format!(
                "Unknown provider '{}'. Available: {}",
                provider,
                available_providers().join(", ")
            ))),
        }
    }
}

/// List all backend set names
pub fn available_providers() -> Vec<&'static str> {
    vec!["openai", "mock"]
}

/// Drives one design run through the three stages
pub struct PipelineOrchestrator {
    services: Arc<Services>,
    run_id: String,
    created_at: String,
    request: Option<DesignRequest>,
    stage: Stage,
    state: PipelineState,
}

impl PipelineOrchestrator {
    /// Start a fresh run
    pub fn new(services: Arc<Services>) -> Self {
        let run = PipelineRun::new();
        Self::from_run(services, run)
    }

    /// Continue a previously saved run
    pub fn from_run(services: Arc<Services>, run: PipelineRun) -> Self {
        Self {
            services,
            run_id: run.id,
            created_at: run.created_at,
            request: run.request,
            stage: run.stage,
            state: run.state,
        }
    }

    /// Snapshot of the run for persistence
    pub fn run(&self) -> PipelineRun {
        PipelineRun {
            id: self.run_id.clone(),
            created_at: self.created_at.clone(),
            stage: self.stage,
            request: self.request.clone(),
            state: self.state.clone(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn request(&self) -> Option<&DesignRequest> {
        self.request.as_ref()
    }

    /// Stage 1: expand the design request into an image prompt
    pub fn expand_prompt(&mut self, request: &DesignRequest) -> Result<&str> {
        tracing::info!(run_id = %self.run_id, styles = request.styles.len(), "expanding prompt");
        let expanded = self
            .services
            .expander
            .expand(request)
            .inspect_err(|e| tracing::warn!(run_id = %self.run_id, error = %e, "prompt expansion failed"))?;

        self.request = Some(request.clone());
        self.advance(Stage::PromptExpanded);
        Ok(self.state.expanded_prompt.insert(expanded).as_str())
    }

    /// Stage 2: render an image.
    ///
    /// A non-blank `override_prompt` is used verbatim; otherwise the expanded
    /// prompt is used. With neither, an empty prompt goes to the provider.
    pub fn synthesize_image(&mut self, override_prompt: Option<&str>) -> Result<&str> {
        let prompt = resolve_override(override_prompt, self.state.expanded_prompt.as_deref())
            .unwrap_or_default()
            .to_string();

        tracing::info!(run_id = %self.run_id, prompt_len = prompt.len(), "synthesizing image");
        let locator = self
            .services
            .synthesizer
            .synthesize(&prompt)
            .inspect_err(|e| tracing::warn!(run_id = %self.run_id, error = %e, "image synthesis failed"))?;

        self.advance(Stage::ImageReady);
        Ok(self.state.image_locator.insert(locator).as_str())
    }

    /// Stage 3: submit an image for reconstruction.
    ///
    /// A non-blank `override_locator` wins over the synthesized image. A
    /// blank locator is rejected before any network call.
    pub fn request_mesh(&mut self, override_locator: Option<&str>) -> Result<&MeshSession> {
        let locator = resolve_override(override_locator, self.state.image_locator.as_deref())
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| {
                GemforgeError::InvalidInput(
                    "an image URL is required before requesting a 3D model".to_string(),
                )
            })?
            .to_string();

        tracing::info!(run_id = %self.run_id, image = %locator, "requesting mesh");
        self.stage = Stage::MeshRequested;
        match self.services.mesh_generator.generate(&locator) {
            Ok(session) => {
                self.stage = Stage::MeshReady;
                Ok(self.state.mesh_session.insert(session))
            }
            Err(e) => {
                tracing::warn!(run_id = %self.run_id, error = %e, "mesh request failed");
                self.stage = Stage::MeshFailed;
                Err(e)
            }
        }
    }

    /// Ask the provider once for the current state of the mesh session
    pub fn refresh_mesh(&mut self) -> Result<&MeshSession> {
        let session = self.valid_session()?;
        let refreshed = self.services.mesh_generator.refresh(session)?;
        Ok(self.state.mesh_session.insert(refreshed))
    }

    /// Make the mesh available locally.
    ///
    /// Uses the provider-reported local path when it exists, otherwise
    /// downloads the remote mesh into a directory keyed by this run.
    pub fn fetch_mesh(&mut self) -> Result<StoredArtifact> {
        let session = self.valid_session()?;

        if let Some(path) = session.mesh_path.as_deref() {
            if self.services.store.exists(path) {
                return self.services.store.stat(path);
            }
        }

        let Some(url) = session.mesh_url.clone() else {
            return Err(GemforgeError::ArtifactNotFound(format!(
                "mesh for session {} is not available yet",
                session.session_code
            )));
        };

        let file_name = format!(
            "{}.{}",
            session.session_code,
            self.services.mesh_generator.mesh_format()
        );
        let bytes = self.services.mesh_generator.download(&url)?;
        let artifact = self
            .services
            .store
            .persist_scoped(&self.run_id, &file_name, &bytes)?;

        if let Some(session) = self.state.mesh_session.as_mut() {
            session.mesh_path = Some(artifact.path.clone());
        }
        Ok(artifact)
    }

    /// Gate before download/visualization: the session must be valid and
    /// its mesh file present on disk.
    pub fn verify_artifact(&mut self) -> Result<PipelineOutcome> {
        let session = self.valid_session()?;
        let session_code = session.session_code.clone();

        let mesh_path = match session.mesh_path.as_deref() {
            Some(path) if self.services.store.exists(path) => path.to_string(),
            other => {
                let shown = other.unwrap_or("<no mesh path reported>").to_string();
                self.stage = Stage::ArtifactMissing;
                tracing::info!(run_id = %self.run_id, mesh_path = %shown, "mesh not available yet");
                return Err(GemforgeError::ArtifactNotFound(shown));
            }
        };

        let artifact = self.services.store.stat(&mesh_path)?;
        self.state.artifact = Some(artifact.clone());
        self.stage = Stage::ArtifactVerified;
        tracing::info!(run_id = %self.run_id, %session_code, %mesh_path, "artifact verified");

        Ok(PipelineOutcome {
            session_code,
            mesh_path,
            artifact,
        })
    }

    /// The terminal success view, only once the artifact is verified
    pub fn outcome(&self) -> Option<PipelineOutcome> {
        if self.stage != Stage::ArtifactVerified {
            return None;
        }
        let session = self.state.mesh_session.as_ref()?;
        Some(PipelineOutcome {
            session_code: session.session_code.clone(),
            mesh_path: session.mesh_path.clone()?,
            artifact: self.state.artifact.clone()?,
        })
    }

    /// Whether an artifact exists at `path`
    pub fn check_artifact(&self, path: &str) -> bool {
        self.services.store.exists(path)
    }

    /// Read an artifact for download
    pub fn download_artifact(&self, path: &str) -> Result<Vec<u8>> {
        self.services.store.read(path)
    }

    /// Store uploaded bytes under their file name (last write wins)
    pub fn persist_artifact(&self, name: &str, bytes: &[u8]) -> Result<StoredArtifact> {
        self.services.store.persist(name, bytes)
    }

    /// Move forward to `to`. Redoing an earlier text or image stage keeps a
    /// later stage, since the session and artifact it describes are untouched.
    fn advance(&mut self, to: Stage) {
        if to.rank() > self.stage.rank() {
            self.stage = to;
        }
    }

    fn valid_session(&self) -> Result<&MeshSession> {
        self.state
            .mesh_session
            .as_ref()
            .filter(|s| s.is_valid())
            .ok_or(GemforgeError::SessionCodeMissing)
    }
}
