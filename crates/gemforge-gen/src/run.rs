//! Saved pipeline runs
//!
//! Runs are persisted as `.run.toml` files in `.gemforge/runs/` so a design
//! can be continued stage by stage across process restarts.

use crate::design::DesignRequest;
use crate::pipeline::{PipelineState, Stage};
use gemforge_core::{GemforgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Serializable snapshot of one design run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Unique run ID (UUID)
    pub id: String,
    /// RFC 3339 timestamp when the run started
    pub created_at: String,
    pub stage: Stage,
    #[serde(default)]
    pub request: Option<DesignRequest>,
    #[serde(default)]
    pub state: PipelineState,
}

impl PipelineRun {
    /// Create a new, idle run
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            stage: Stage::Idle,
            request: None,
            state: PipelineState::default(),
        }
    }
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

/// File-based run store
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    /// Create a new run store at the given root directory
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Default run store location
    pub fn default_store() -> Self {
        Self::new(".gemforge/runs")
    }

    /// Save a run to disk, replacing any earlier snapshot
    pub fn save(&self, run: &PipelineRun) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.path_for(&run.id);

        let wrapper = RunFile { run: run.clone() };
        let content = toml::to_string_pretty(&wrapper)?;
        std::fs::write(&path, content)?;

        tracing::debug!(run_id = %run.id, stage = %run.stage, path = %path.display(), "run saved");
        Ok(path)
    }

    /// Load a run by ID
    pub fn load(&self, run_id: &str) -> Result<PipelineRun> {
        let path = self.path_for(run_id);
        if !path.exists() {
            return Err(GemforgeError::RunNotFound(run_id.to_string()));
        }

        let content = std::fs::read_to_string(&path)?;
        let file: RunFile = toml::from_str(&content)?;
        Ok(file.run)
    }

    /// List all saved runs, oldest first
    pub fn list(&self) -> Result<Vec<PipelineRun>> {
        let mut runs = Vec::new();

        if !self.root.exists() {
            return Ok(runs);
        }

        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_run = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(".run.toml"))
                .unwrap_or(false);
            if !is_run {
                continue;
            }

            let content = std::fs::read_to_string(&path)?;
            match toml::from_str::<RunFile>(&content) {
                Ok(file) => runs.push(file.run),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable run file"),
            }
        }

        runs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(runs)
    }

    fn path_for(&self, run_id: &str) -> PathBuf {
        self.root.join(format!("{}.run.toml", run_id))
    }
}

#[derive(Serialize, Deserialize)]
struct RunFile {
    run: PipelineRun,
}
