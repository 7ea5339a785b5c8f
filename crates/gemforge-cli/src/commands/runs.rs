//! Saved run inspection commands

use super::load_config;
use anyhow::Result;
use gemforge_gen::{PipelineRun, RunStore};

pub fn run_status(run_id: &str) -> Result<()> {
    let config = load_config()?;
    let run = RunStore::new(&config.store.runs_dir).load(run_id)?;
    print_run(&run);
    Ok(())
}

pub fn run_list() -> Result<()> {
    let config = load_config()?;
    let runs = RunStore::new(&config.store.runs_dir).list()?;

    if runs.is_empty() {
        println!("No design runs found.");
        return Ok(());
    }

    println!("{} run(s):\n", runs.len());
    for run in &runs {
        let prompt = run
            .request
            .as_ref()
            .map(|r| r.raw_prompt.as_str())
            .unwrap_or("-");
        println!("  {}  {:<18}  {}  {}", run.id, run.stage.to_string(), run.created_at, prompt);
    }
    Ok(())
}

fn print_run(run: &PipelineRun) {
    println!("Run: {}", run.id);
    println!("  Created: {}", run.created_at);
    println!("  Stage: {}", run.stage);
    if let Some(request) = &run.request {
        println!("  Prompt: {}", request.raw_prompt);
        if !request.styles.is_empty() {
            println!("  Styles: {}", request.styles.join(", "));
        }
    }

    let state = &run.state;
    if let Some(prompt) = &state.expanded_prompt {
        println!("  Expanded prompt: {}", prompt);
    }
    if let Some(locator) = &state.image_locator {
        println!("  Image: {}", locator);
    }
    if let Some(session) = &state.mesh_session {
        println!("  Session: {}", session.session_code);
        if let Some(status) = &session.status {
            println!("    Status: {}", status);
        }
        if let Some(url) = &session.mesh_url {
            println!("    Mesh URL: {}", url);
        }
        if let Some(path) = &session.mesh_path {
            println!("    Mesh path: {}", path);
        }
        if let Some(spin) = &session.spin_video_url {
            println!("    Spin video: {}", spin);
        }
    }
    if let Some(artifact) = &state.artifact {
        println!(
            "  Artifact: {} ({} bytes, {})",
            artifact.path, artifact.size_bytes, artifact.content_hash
        );
    }
}
