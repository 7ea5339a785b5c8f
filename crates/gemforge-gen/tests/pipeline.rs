//! End-to-end pipeline scenarios against the mock client

use gemforge_core::{GemforgeError, ServiceErrorKind};
use gemforge_gen::{
    ArtifactStore, DesignRequest, Endpoint, GemforgeConfig, MockServiceClient,
    PipelineOrchestrator, RunStore, Services, Stage,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gemforge_{}_{}", label, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn pipeline_with(mock: &Arc<MockServiceClient>, root: &PathBuf) -> PipelineOrchestrator {
    let services = Services::with_clients(
        mock.clone(),
        mock.clone(),
        &GemforgeConfig::default(),
        ArtifactStore::new(root),
    );
    PipelineOrchestrator::new(Arc::new(services))
}

#[test]
fn ruby_ring_reaches_terminal_success() {
    let dir = temp_dir("e2e");
    let mock = Arc::new(MockServiceClient::new());
    let mut pipeline = pipeline_with(&mock, &dir);

    let request = DesignRequest::new(
        "a ring with a ruby",
        vec!["Modern".to_string(), "Minimalist".to_string()],
    );
    assert_eq!(
        request.combined_prompt(),
        "a ring with a ruby the image must have a white background and the styles should include modern, minimalist"
    );

    // Provider writes the mesh somewhere we can address; persist it the same way
    let mesh_bytes = gemforge_gen::mock::minimal_glb();
    let stored = pipeline.persist_artifact("mesh.glb", &mesh_bytes).unwrap();

    mock.respond(
        &Endpoint::ChatCompletion,
        json!({"choices": [{"message": {"content": "A sleek modern minimalist ruby ring..."}}]}),
    )
    .respond(
        &Endpoint::ImageGeneration,
        json!({"data": [{"url": "https://example/img.png"}]}),
    )
    .respond(
        &Endpoint::ImageToMesh,
        json!({"session_code": "abc123", "mesh_path": stored.path}),
    );

    let expanded = pipeline.expand_prompt(&request).unwrap().to_string();
    assert_eq!(expanded, "A sleek modern minimalist ruby ring...");
    assert_eq!(
        mock.last_payload(&Endpoint::ChatCompletion).unwrap()["messages"][0]["content"],
        request.combined_prompt()
    );
    assert_eq!(pipeline.stage(), Stage::PromptExpanded);

    let locator = pipeline.synthesize_image(None).unwrap().to_string();
    assert_eq!(locator, "https://example/img.png");
    assert_eq!(
        mock.last_payload(&Endpoint::ImageGeneration).unwrap()["prompt"],
        "A sleek modern minimalist ruby ring..."
    );
    assert_eq!(pipeline.stage(), Stage::ImageReady);

    let session = pipeline.request_mesh(None).unwrap();
    assert_eq!(session.session_code, "abc123");
    assert_eq!(
        mock.last_payload(&Endpoint::ImageToMesh).unwrap()["image_url"],
        "https://example/img.png"
    );
    assert_eq!(pipeline.stage(), Stage::MeshReady);

    assert!(pipeline.check_artifact(&stored.path));
    let outcome = pipeline.verify_artifact().unwrap();
    assert_eq!(outcome.session_code, "abc123");
    assert_eq!(outcome.mesh_path, stored.path);
    assert_eq!(outcome.artifact.size_bytes, mesh_bytes.len() as u64);
    assert_eq!(pipeline.stage(), Stage::ArtifactVerified);
    assert_eq!(pipeline.download_artifact(&stored.path).unwrap(), mesh_bytes);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_session_code_never_yields_a_session() {
    let dir = temp_dir("nocode");
    let mock = Arc::new(MockServiceClient::new());
    let mut pipeline = pipeline_with(&mock, &dir);
    mock.respond(&Endpoint::ImageToMesh, json!({"status": "queued", "mesh_path": "./mesh.glb"}));

    let err = pipeline.request_mesh(Some("https://example/img.png")).unwrap_err();
    assert!(matches!(err, GemforgeError::SessionCodeMissing));
    assert!(!err.is_recoverable());
    assert!(pipeline.state().mesh_session.is_none());
    assert_eq!(pipeline.stage(), Stage::MeshFailed);
    assert!(matches!(
        pipeline.verify_artifact(),
        Err(GemforgeError::SessionCodeMissing)
    ));
    assert!(pipeline.outcome().is_none());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn image_retry_does_not_reexpand() {
    let dir = temp_dir("retry");
    let mock = Arc::new(MockServiceClient::new());
    let mut pipeline = pipeline_with(&mock, &dir);
    mock.fail(&Endpoint::ImageGeneration, ServiceErrorKind::RateLimited, "HTTP 429")
        .respond(&Endpoint::ImageGeneration, json!({"data": [{"url": "https://example/img.png"}]}));

    pipeline
        .expand_prompt(&DesignRequest::new("an emerald brooch", vec![]))
        .unwrap();
    let before = pipeline.state().expanded_prompt.clone();

    let err = pipeline.synthesize_image(None).unwrap_err();
    assert_eq!(err.service_kind(), Some(ServiceErrorKind::RateLimited));
    assert_eq!(pipeline.stage(), Stage::PromptExpanded);
    assert_eq!(pipeline.state().expanded_prompt, before);

    pipeline.synthesize_image(None).unwrap();
    pipeline.synthesize_image(None).unwrap();
    assert_eq!(mock.calls_to(&Endpoint::ChatCompletion), 1);
    assert_eq!(mock.calls_to(&Endpoint::ImageGeneration), 3);
    assert_eq!(pipeline.state().expanded_prompt, before);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn empty_locator_makes_no_network_calls() {
    let dir = temp_dir("nolocator");
    let mock = Arc::new(MockServiceClient::new());
    let mut pipeline = pipeline_with(&mock, &dir);

    let err = pipeline.request_mesh(Some("")).unwrap_err();
    assert!(matches!(err, GemforgeError::InvalidInput(_)));
    assert_eq!(mock.call_count(), 0);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn saved_run_continues_in_a_new_orchestrator() {
    let dir = temp_dir("resume");
    let mock = Arc::new(MockServiceClient::new());
    let runs = RunStore::new(dir.join("runs"));

    let mut first = pipeline_with(&mock, &dir);
    first
        .expand_prompt(&DesignRequest::new("a pearl necklace", vec!["Classic".into()]))
        .unwrap();
    first.synthesize_image(None).unwrap();
    runs.save(&first.run()).unwrap();
    let run_id = first.run_id().to_string();
    drop(first);

    let services = Services::with_clients(
        mock.clone(),
        mock.clone(),
        &GemforgeConfig::default(),
        ArtifactStore::new(&dir),
    );
    let mut resumed = PipelineOrchestrator::from_run(Arc::new(services), runs.load(&run_id).unwrap());
    assert_eq!(resumed.stage(), Stage::ImageReady);

    resumed.request_mesh(None).unwrap();
    resumed.refresh_mesh().unwrap();
    let artifact = resumed.fetch_mesh().unwrap();
    assert!(artifact.path.contains(&run_id));
    resumed.verify_artifact().unwrap();
    assert_eq!(mock.calls_to(&Endpoint::ChatCompletion), 1);

    std::fs::remove_dir_all(&dir).ok();
}
