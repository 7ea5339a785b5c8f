//! CLI command implementations

pub mod artifact;
pub mod design;
pub mod runs;

use anyhow::{Context as _, Result};
use gemforge_gen::{GemforgeConfig, PipelineOrchestrator, RunStore, Services};
use std::sync::Arc;

/// Config, shared services and the run store for one CLI invocation
pub struct Workspace {
    pub services: Arc<Services>,
    pub runs: RunStore,
}

impl Workspace {
    pub fn open(provider: Option<&str>) -> Result<Self> {
        let config = load_config()?;
        let provider = provider
            .map(str::to_string)
            .unwrap_or_else(|| config.generation.provider.clone());
        let services = Services::from_config(&config, &provider)
            .with_context(|| format!("set up provider '{}'", provider))?;
        tracing::debug!(%provider, "services ready");

        Ok(Self {
            services: Arc::new(services),
            runs: RunStore::new(&config.store.runs_dir),
        })
    }

    /// Load a saved run into a fresh orchestrator
    pub fn resume(&self, run_id: &str) -> Result<PipelineOrchestrator> {
        let run = self
            .runs
            .load(run_id)
            .with_context(|| format!("load run {}", run_id))?;
        Ok(PipelineOrchestrator::from_run(self.services.clone(), run))
    }

    pub fn save(&self, pipeline: &PipelineOrchestrator) -> Result<()> {
        self.runs
            .save(&pipeline.run())
            .with_context(|| format!("save run {}", pipeline.run_id()))?;
        Ok(())
    }
}

pub fn load_config() -> Result<GemforgeConfig> {
    GemforgeConfig::load().context("load gemforge config")
}
