//! Integration tests for BatchProcessor with real subprocesses
//!
//! These tests verify:
//! - A zero exit status marks the file succeeded
//! - Non-zero exits and missing processors fail only that file
//! - Script mode writes and runs the per-file script
//! - Json-only mode stops after the configs
//!
//! Unix-only tests use `true` and `false` as stand-in processors.

use camino::Utf8PathBuf;
use rpdx_frontend::metrics::Metrics;
use rpdx_frontend::models::{AppState, FrontendSettings, JobStatus, OptionModel, RunMode};
use rpdx_frontend::services::{BatchProcessor, TokioProcessRunner};
use rpdx_frontend::StateManager;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::watch;

fn create_inputs(files: &[&str]) -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    for name in files {
        fs::write(root.join(name), "").unwrap();
    }
    (temp_dir, root)
}

fn state_for(root: &Utf8PathBuf, files: &[&str], settings: FrontendSettings) -> StateManager {
    let mut state = AppState::with_settings(settings);
    state.options = OptionModel::with_defaults();
    let manager = StateManager::with_state(state);
    manager.add_files(files.iter().map(|name| root.join(name)));
    manager
}

async fn run(state: &StateManager, settings: &FrontendSettings) -> rpdx_frontend::services::BatchSummary {
    let processor = BatchProcessor::new(
        TokioProcessRunner::new(settings.timeout()),
        state.clone(),
        Arc::new(Metrics::new()),
    );
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    processor.run_queue(cancel_rx).await
}

#[cfg(unix)]
#[tokio::test]
async fn test_successful_processor_run() {
    let files = ["model.fbx"];
    let (_temp_dir, root) = create_inputs(&files);
    let settings = FrontendSettings {
        processor_exe: "true".to_string(),
        ..Default::default()
    };
    let state = state_for(&root, &files, settings.clone());

    let summary = run(&state, &settings).await;

    assert_eq!(summary.succeeded(), 1);
    let report = &summary.reports[0];
    assert_eq!(report.configs.len(), 4);
    let command = report.command.as_deref().unwrap();
    assert!(command.starts_with("true -i "));
    assert!(command.ends_with(" -r"));

    let model_root = root.canonicalize_utf8().unwrap().join("dirlod").join("model");
    assert!(model_root.join("UserCustomConfigRPDX.Json").is_file());
    assert!(model_root.join("usdz").is_dir());
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_processor_does_not_stop_batch() {
    let files = ["a.obj", "b.obj"];
    let (_temp_dir, root) = create_inputs(&files);
    let settings = FrontendSettings {
        processor_exe: "false".to_string(),
        ..Default::default()
    };
    let state = state_for(&root, &files, settings.clone());

    let summary = run(&state, &settings).await;

    assert_eq!(summary.failed(), 2);
    assert!(summary.has_failures());
    assert!(summary.reports.iter().all(|r| r.error.as_deref() == Some("Processor exited with status 1")));
    // Nothing is rolled back: configs stay on disk after the processor failed
    let outputs = root.canonicalize_utf8().unwrap().join("dirlod");
    assert!(outputs.join("a").join("UserCustomConfigRPDX_obj.Json").is_file());
    assert!(outputs.join("b").join("UserCustomConfigRPDX_obj.Json").is_file());
    let snapshot = state.snapshot();
    assert_eq!(snapshot.failed_files.len(), 2);
    assert_eq!(snapshot.progress, 2);
}

#[tokio::test]
async fn test_missing_processor_fails_each_file() {
    let files = ["a.glb", "b.gltf"];
    let (_temp_dir, root) = create_inputs(&files);
    let settings = FrontendSettings {
        processor_exe: "rpdx-definitely-not-installed".to_string(),
        ..Default::default()
    };
    let state = state_for(&root, &files, settings.clone());

    let summary = run(&state, &settings).await;

    assert_eq!(summary.reports.len(), 2);
    for report in &summary.reports {
        assert_eq!(report.status, JobStatus::Failed);
        assert!(report.error.as_deref().unwrap().contains("not found"));
    }
}

#[tokio::test]
async fn test_input_removed_after_queueing() {
    let files = ["gone.obj", "kept.obj"];
    let (_temp_dir, root) = create_inputs(&files);
    let settings = FrontendSettings {
        run_mode: RunMode::JsonOnly,
        ..Default::default()
    };
    let state = state_for(&root, &files, settings.clone());
    fs::remove_file(root.join("gone.obj")).unwrap();

    let summary = run(&state, &settings).await;

    assert_eq!(summary.reports[0].status, JobStatus::Failed);
    assert!(summary.reports[0].error.as_deref().unwrap().contains("File not found"));
    assert_eq!(summary.reports[1].status, JobStatus::ConfigsOnly);
}

#[cfg(unix)]
#[tokio::test]
async fn test_script_mode_writes_and_runs_script() {
    let files = ["crate.obj"];
    let (_temp_dir, root) = create_inputs(&files);
    let settings = FrontendSettings {
        processor_exe: "true".to_string(),
        run_mode: RunMode::Script,
        ..Default::default()
    };
    let state = state_for(&root, &files, settings.clone());

    let summary = run(&state, &settings).await;

    assert_eq!(summary.succeeded(), 1);
    let script = root
        .canonicalize_utf8()
        .unwrap()
        .join("dirlod")
        .join("crate")
        .join("crate_convert.sh");
    let body = fs::read_to_string(&script).unwrap();
    assert!(body.starts_with("#!/bin/sh\n"));
    assert!(body.contains("--read_config"));
    assert_eq!(summary.reports[0].command.as_deref(), Some(format!("sh {}", script).as_str()));
}

#[tokio::test]
async fn test_json_only_mode_never_spawns() {
    let files = ["tree.png"];
    let (_temp_dir, root) = create_inputs(&files);
    let settings = FrontendSettings {
        processor_exe: "rpdx-definitely-not-installed".to_string(),
        run_mode: RunMode::JsonOnly,
        include_usdz: true,
        ..Default::default()
    };
    let state = state_for(&root, &files, settings.clone());

    let summary = run(&state, &settings).await;

    assert_eq!(summary.configs_only(), 1);
    assert!(!summary.has_failures());
    assert_eq!(summary.reports[0].configs.len(), 5);
    assert!(state.read(|s| s.configs_only_files.contains("tree.png")));
}

/// Stand-in processor that succeeds only when `-i` is followed by an existing file
#[cfg(unix)]
fn write_checking_processor(root: &Utf8PathBuf) -> Utf8PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let processor = root.join("check-rpdx");
    fs::write(&processor, "#!/bin/sh\n[ \"$1\" = -i ] && [ -f \"$2\" ]\n").unwrap();
    fs::set_permissions(&processor, fs::Permissions::from_mode(0o755)).unwrap();
    processor
}

#[cfg(unix)]
#[tokio::test]
async fn test_script_mode_keeps_shell_characters_literal() {
    let files = ["bob's.obj", "a&b.obj", "semi;colon $HOME (1).fbx"];
    let (_temp_dir, root) = create_inputs(&files);
    let processor = write_checking_processor(&root);

    for run_mode in [RunMode::Direct, RunMode::Script] {
        let settings = FrontendSettings {
            processor_exe: processor.to_string(),
            run_mode,
            ..Default::default()
        };
        let state = state_for(&root, &files, settings.clone());

        let summary = run(&state, &settings).await;

        for report in &summary.reports {
            assert_eq!(
                report.status,
                JobStatus::Succeeded,
                "{:?} {}: {:?}",
                run_mode,
                report.file,
                report.error
            );
        }
        assert_eq!(summary.succeeded(), 3);
    }

    let script = root
        .canonicalize_utf8()
        .unwrap()
        .join("dirlod")
        .join("bob's")
        .join("bob's_convert.sh");
    let body = fs::read_to_string(&script).unwrap();
    assert!(body.contains(r"/bob'\''s.obj'"));
}
