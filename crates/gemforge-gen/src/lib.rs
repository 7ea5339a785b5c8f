//! Gemforge Gen - design-to-mesh generation pipeline
//!
//! Expands a jewellery design prompt via a text model, renders it via an
//! image model, and reconstructs a 3D mesh from the image. The
//! `PipelineOrchestrator` carries each stage's output into the next and
//! keeps partial results when a stage fails.

pub mod client;
pub mod config;
pub mod design;
pub mod expander;
pub mod http;
pub mod mesh;
pub mod mock;
pub mod pipeline;
pub mod run;
pub mod store;
pub mod style;
pub mod synthesizer;

pub use client::{Endpoint, ServiceClient};
pub use config::GemforgeConfig;
pub use design::{DesignRequest, GenerationResult};
pub use expander::PromptExpander;
pub use http::HttpServiceClient;
pub use mesh::{MeshGenerator, MeshSession};
pub use mock::MockServiceClient;
pub use pipeline::{PipelineOrchestrator, PipelineOutcome, PipelineState, Services, Stage};
pub use run::{PipelineRun, RunStore};
pub use store::{ArtifactStore, StoredArtifact};
pub use synthesizer::{ImageParams, ImageSynthesizer};
