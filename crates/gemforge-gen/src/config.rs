//! Layered configuration system
//!
//! Config is loaded with three layers of precedence (highest wins):
//! 1. Environment variables: `GEMFORGE_{PROVIDER}_API_KEY`
//!    (falling back to the provider's own `{PROVIDER}_API_KEY`)
//! 2. Project-local: `.gemforge/config.toml`
//! 3. Global: `~/.gemforge/config.toml`

use gemforge_core::{GemforgeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Providers whose keys are picked up from the environment
pub const KEYED_PROVIDERS: [&str; 2] = ["openai", "csm"];

/// Provider-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            enabled: true,
        }
    }
}

/// Fixed generation parameters for the three stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Backend set: "openai" (OpenAI + CSM over HTTP) or "mock"
    pub provider: String,
    pub text_model: String,
    pub temperature: f64,
    pub image_model: String,
    pub image_size: String,
    pub image_quality: String,
    pub mesh_format: String,
    pub spin_video: bool,
    /// Transport timeout per request
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            text_model: "gpt-4o".to_string(),
            temperature: 0.7,
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1024".to_string(),
            image_quality: "standard".to_string(),
            mesh_format: "glb".to_string(),
            spin_video: true,
            timeout_secs: 120,
        }
    }
}

/// Where artifacts and run records live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub root: String,
    pub runs_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: "./".to_string(),
            runs_dir: ".gemforge/runs".to_string(),
        }
    }
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GemforgeConfigFile {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Resolved configuration with environment variable overrides applied
#[derive(Debug, Clone, Default)]
pub struct GemforgeConfig {
    pub providers: HashMap<String, ProviderConfig>,
    pub generation: GenerationConfig,
    pub store: StoreConfig,
}

impl GemforgeConfig {
    /// Load config with layered precedence: global < project < env vars
    pub fn load() -> Result<Self> {
        let mut config = GemforgeConfigFile::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                Self::merge_into(&mut config, global);
            }
        }

        let local_path = PathBuf::from(".gemforge/config.toml");
        if local_path.exists() {
            let local = Self::load_file(&local_path)?;
            Self::merge_into(&mut config, local);
        }

        Self::apply_env_overrides(&mut config);
        tracing::debug!(
            provider = %config.generation.provider,
            store_root = %config.store.root,
            "config loaded"
        );

        Ok(config.into())
    }

    /// Load config from a specific file path only (for testing)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        Self::apply_env_overrides(&mut config);
        Ok(config.into())
    }

    /// Get API key for a provider
    pub fn api_key(&self, provider_name: &str) -> Option<&str> {
        self.providers
            .get(provider_name)
            .and_then(|p| p.api_key.as_deref())
            .filter(|k| !k.is_empty())
    }

    /// Get API URL override for a provider
    pub fn api_url(&self, provider_name: &str) -> Option<&str> {
        self.providers
            .get(provider_name)
            .and_then(|p| p.api_url.as_deref())
    }

    /// Check if a provider is enabled
    pub fn is_enabled(&self, provider_name: &str) -> bool {
        self.providers
            .get(provider_name)
            .map(|p| p.enabled)
            .unwrap_or(true)
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".gemforge").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<GemforgeConfigFile> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            GemforgeError::ConfigError(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }

    fn merge_into(base: &mut GemforgeConfigFile, overlay: GemforgeConfigFile) {
        for (name, provider) in overlay.providers {
            let entry = base.providers.entry(name).or_default();
            if provider.api_key.is_some() {
                entry.api_key = provider.api_key;
            }
            if provider.api_url.is_some() {
                entry.api_url = provider.api_url;
            }
            entry.enabled = provider.enabled;
        }

        // A field equal to its default is treated as "not set" in the overlay
        let defaults = GenerationConfig::default();
        let over = overlay.generation;
        let gen = &mut base.generation;
        if over.provider != defaults.provider {
            gen.provider = over.provider;
        }
        if over.text_model != defaults.text_model {
            gen.text_model = over.text_model;
        }
        if over.temperature != defaults.temperature {
            gen.temperature = over.temperature;
        }
        if over.image_model != defaults.image_model {
            gen.image_model = over.image_model;
        }
        if over.image_size != defaults.image_size {
            gen.image_size = over.image_size;
        }
        if over.image_quality != defaults.image_quality {
            gen.image_quality = over.image_quality;
        }
        if over.mesh_format != defaults.mesh_format {
            gen.mesh_format = over.mesh_format;
        }
        if over.spin_video != defaults.spin_video {
            gen.spin_video = over.spin_video;
        }
        if over.timeout_secs != defaults.timeout_secs {
            gen.timeout_secs = over.timeout_secs;
        }

        let store_defaults = StoreConfig::default();
        if overlay.store.root != store_defaults.root {
            base.store.root = overlay.store.root;
        }
        if overlay.store.runs_dir != store_defaults.runs_dir {
            base.store.runs_dir = overlay.store.runs_dir;
        }
    }

    fn apply_env_overrides(config: &mut GemforgeConfigFile) {
        for name in &KEYED_PROVIDERS {
            let upper = name.to_uppercase();
            let entry = config.providers.entry(name.to_string()).or_default();

            if entry.api_key.is_none() {
                if let Ok(key) = std::env::var(format!("{}_API_KEY", upper)) {
                    entry.api_key = Some(key);
                }
            }
            if let Ok(key) = std::env::var(format!("GEMFORGE_{}_API_KEY", upper)) {
                entry.api_key = Some(key);
            }
        }
    }
}

impl From<GemforgeConfigFile> for GemforgeConfig {
    fn from(file: GemforgeConfigFile) -> Self {
        Self {
            providers: file.providers,
            generation: file.generation,
            store: file.store,
        }
    }
}
