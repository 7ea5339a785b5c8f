//! Pipeline stage commands

use super::Workspace;
use anyhow::Result;
use gemforge_core::GemforgeError;
use gemforge_gen::style::{find_style, partition_styles};
use gemforge_gen::{DesignRequest, PipelineOrchestrator, StoredArtifact};

/// Normalize known styles to catalog spelling and warn about the rest
fn build_request(prompt: &str, styles: Vec<String>) -> DesignRequest {
    let (_, unknown) = partition_styles(&styles);
    if !unknown.is_empty() {
        eprintln!(
            "Warning: not in the style catalog (sent anyway): {}",
            unknown.join(", ")
        );
    }

    let styles = styles
        .into_iter()
        .map(|s| find_style(&s).map(str::to_string).unwrap_or(s))
        .collect();
    DesignRequest::new(prompt, styles)
}

pub fn run_generate(
    provider: Option<&str>,
    prompt: &str,
    styles: Vec<String>,
    image_prompt: Option<&str>,
) -> Result<()> {
    let ws = Workspace::open(provider)?;
    let mut pipeline = PipelineOrchestrator::new(ws.services.clone());
    println!("Run {}", pipeline.run_id());

    let result = generate_all(&mut pipeline, &build_request(prompt, styles), image_prompt);
    // Keep whatever succeeded so the failed stage can be retried on its own
    ws.save(&pipeline)?;

    match result {
        Err(GemforgeError::ArtifactNotFound(what)) => {
            println!("  Mesh not ready yet: {}", what);
            println!("  Try again later: gemforge fetch --run {}", pipeline.run_id());
            Ok(())
        }
        Err(e) => {
            eprintln!("  Stopped at stage: {}", pipeline.stage());
            Err(e.into())
        }
        Ok(()) => Ok(()),
    }
}

fn generate_all(
    pipeline: &mut PipelineOrchestrator,
    request: &DesignRequest,
    image_prompt: Option<&str>,
) -> gemforge_core::Result<()> {
    println!("  Prompt: {}", request.combined_prompt());
    let expanded = pipeline.expand_prompt(request)?;
    println!("  Generated prompt: {}", expanded);

    let image = pipeline.synthesize_image(image_prompt)?;
    println!("  Image: {}", image);

    let session = pipeline.request_mesh(None)?;
    println!("  Session code: {}", session.session_code);

    if session.mesh_path.is_none() && session.mesh_url.is_none() {
        pipeline.refresh_mesh()?;
    }
    pipeline.fetch_mesh()?;
    print_outcome(pipeline)
}

pub fn run_prompt(provider: Option<&str>, prompt: &str, styles: Vec<String>) -> Result<()> {
    let ws = Workspace::open(provider)?;
    let mut pipeline = PipelineOrchestrator::new(ws.services.clone());
    let request = build_request(prompt, styles);

    println!("Run {}", pipeline.run_id());
    println!("  Prompt: {}", request.combined_prompt());
    let result = pipeline.expand_prompt(&request).map(|p| p.to_string());
    ws.save(&pipeline)?;

    println!("  Generated prompt: {}", result?);
    println!("  Next: gemforge image --run {}", pipeline.run_id());
    Ok(())
}

pub fn run_image(provider: Option<&str>, run_id: &str, prompt: Option<&str>) -> Result<()> {
    let ws = Workspace::open(provider)?;
    let mut pipeline = ws.resume(run_id)?;

    let result = pipeline.synthesize_image(prompt).map(|l| l.to_string());
    ws.save(&pipeline)?;

    println!("  Image: {}", result?);
    println!("  Next: gemforge mesh --run {}", run_id);
    Ok(())
}

pub fn run_mesh(provider: Option<&str>, run_id: &str, image_url: Option<&str>) -> Result<()> {
    let ws = Workspace::open(provider)?;
    let mut pipeline = ws.resume(run_id)?;

    let result = pipeline
        .request_mesh(image_url)
        .map(|s| s.session_code.clone());
    ws.save(&pipeline)?;

    println!("  Session code: {}", result?);
    println!("  Next: gemforge fetch --run {}", run_id);
    Ok(())
}

pub fn run_fetch(provider: Option<&str>, run_id: &str) -> Result<()> {
    let ws = Workspace::open(provider)?;
    let mut pipeline = ws.resume(run_id)?;

    let result = fetch(&mut pipeline);
    ws.save(&pipeline)?;

    match result {
        Ok(artifact) => {
            println!("  Mesh: {} ({} bytes)", artifact.path, artifact.size_bytes);
            Ok(())
        }
        Err(GemforgeError::ArtifactNotFound(what)) => {
            println!("  Mesh not ready yet: {}", what);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn fetch(pipeline: &mut PipelineOrchestrator) -> gemforge_core::Result<StoredArtifact> {
    if let Some(status) = pipeline.refresh_mesh()?.status.as_deref() {
        println!("  Provider status: {}", status);
    }
    pipeline.fetch_mesh()
}

pub fn run_verify(provider: Option<&str>, run_id: &str) -> Result<()> {
    let ws = Workspace::open(provider)?;
    let mut pipeline = ws.resume(run_id)?;

    let result = print_outcome(&mut pipeline);
    ws.save(&pipeline)?;
    Ok(result?)
}

fn print_outcome(pipeline: &mut PipelineOrchestrator) -> gemforge_core::Result<()> {
    let outcome = pipeline.verify_artifact()?;
    println!("  Verified session {}", outcome.session_code);
    println!("  Mesh: {}", outcome.mesh_path);
    println!(
        "  Size: {} bytes ({})",
        outcome.artifact.size_bytes, outcome.artifact.content_hash
    );
    Ok(())
}
