//! Artifact store commands

use super::load_config;
use anyhow::{Context, Result};
use gemforge_gen::ArtifactStore;
use std::path::Path;

pub fn run_upload(path: &str) -> Result<()> {
    let config = load_config()?;
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path))?;
    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("'{}' has no file name", path))?;

    let artifact = ArtifactStore::new(&config.store.root).persist(name, &bytes)?;
    println!("Uploaded '{}'.", name);
    println!("  Saved to: {}", artifact.path);
    println!("  Size: {} bytes", artifact.size_bytes);
    println!("  Hash: {}", artifact.content_hash);
    Ok(())
}

pub fn run_download(path: &str, output: &str) -> Result<()> {
    let config = load_config()?;
    let bytes = ArtifactStore::new(&config.store.root).read(path)?;
    std::fs::write(output, &bytes).with_context(|| format!("write {}", output))?;
    println!("Downloaded {} ({} bytes) to {}", path, bytes.len(), output);
    Ok(())
}
