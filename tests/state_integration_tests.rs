//! Integration tests for StateManager with state change events
//!
//! These tests verify that the StateManager correctly:
//! - Emits state change events on mutations
//! - Supports multiple subscribers
//! - Handles concurrent access from multiple threads
//! - Maintains consistency across batch transitions

use camino::Utf8PathBuf;
use rpdx_frontend::models::{JobStage, JobStatus, OptionValue};
use rpdx_frontend::{StateChange, StateManager};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::time::{Duration, timeout};

#[tokio::test]
async fn test_state_change_events_emitted() {
    let state = Arc::new(StateManager::new());
    let mut rx = state.subscribe();

    state.start_batch(2);

    let event = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");

    assert!(
        matches!(event, StateChange::BatchStarted { total_files: 2 }),
        "Expected BatchStarted event, got: {:?}",
        event
    );
}

#[tokio::test]
async fn test_multiple_subscribers_receive_events() {
    let state = Arc::new(StateManager::new());
    let mut rx1 = state.subscribe();
    let mut rx2 = state.subscribe();

    state
        .set_option("modifier.enabled", OptionValue::Bool(true))
        .unwrap();

    for rx in [&mut rx1, &mut rx2] {
        let event = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("Timeout waiting for event")
            .expect("Channel closed");
        assert_eq!(event, StateChange::OptionsChanged);
    }
}

#[tokio::test]
async fn test_rejected_option_emits_nothing() {
    let state = StateManager::new();
    let mut rx = state.subscribe();

    let result = state.set_option_raw("sceneGraph.preserveDepthLevel", "99");
    assert!(result.is_err());
    assert!(rx.try_recv().is_err());
    assert!(state.read(|s| s.options.is_empty()));
}

#[tokio::test]
async fn test_queue_events() {
    let temp_dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    fs::write(root.join("a.obj"), "").unwrap();
    fs::write(root.join("b.usdz"), "").unwrap();
    fs::write(root.join("c.stl"), "").unwrap();

    let state = StateManager::new();
    let mut rx = state.subscribe();

    let (report, _) = state.add_files([root.join("a.obj"), root.join("b.usdz"), root.join("c.stl")]);
    assert_eq!(report.accepted.len(), 2);

    let mut saw_queue = false;
    let mut saw_rejected = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            StateChange::QueueChanged { queued } => {
                assert_eq!(queued, 2);
                saw_queue = true;
            }
            StateChange::FilesRejected { paths } => {
                assert!(paths[0].ends_with("c.stl"));
                saw_rejected = true;
            }
            _ => {}
        }
    }
    assert!(saw_queue && saw_rejected);

    let changes = state.clear_queue();
    assert_eq!(changes, vec![StateChange::QueueChanged { queued: 0 }]);
    assert!(state.read(|s| s.rejected_files.is_empty()));
}

#[tokio::test]
async fn test_batch_workflow_events() {
    let state = StateManager::new();
    let mut rx = state.subscribe();

    state.start_batch(2);
    state.begin_file("a.obj".to_string());
    state.set_stage(JobStage::SerializeConfigs);
    state.add_file_result("a.obj".to_string(), JobStatus::Succeeded, "done".to_string());
    state.begin_file("b.fbx".to_string());
    state.add_file_result("b.fbx".to_string(), JobStatus::Failed, "exit 2".to_string());
    state.finish_batch();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert!(matches!(events.first(), Some(StateChange::BatchStarted { total_files: 2 })));
    assert!(events.contains(&StateChange::StageChanged {
        stage: JobStage::SerializeConfigs
    }));
    let processed: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            StateChange::FileProcessed { file, .. } => Some(file.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(processed, vec!["a.obj", "b.fbx"]);
    assert!(events.iter().any(|e| matches!(
        e,
        StateChange::BatchFinished {
            succeeded: 1,
            configs_only: 0,
            failed: 1
        }
    )));

    let snapshot = state.snapshot();
    assert_eq!(snapshot.progress, 2);
    assert_eq!(snapshot.current_stage, JobStage::Idle);
    assert_eq!(snapshot.results_summary(), "2 of 2 file(s): 1 succeeded, 1 failed");
}

#[tokio::test]
async fn test_concurrent_state_access() {
    let state = Arc::new(StateManager::new());
    state.start_batch(40);

    let mut handles = Vec::new();
    for worker in 0..4 {
        let state = Arc::clone(&state);
        handles.push(tokio::spawn(async move {
            for i in 0..10 {
                state.add_file_result(format!("w{}_{}.obj", worker, i), JobStatus::Succeeded, String::new());
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let (succeeded, _, failed, total) = state.read(|s| s.batch_stats());
    assert_eq!(succeeded, 40);
    assert_eq!(failed, 0);
    assert_eq!(total, 40);
}

#[tokio::test]
async fn test_new_batch_clears_previous_results() {
    let state = StateManager::new();

    state.start_batch(1);
    state.add_file_result("old.obj".to_string(), JobStatus::Failed, "boom".to_string());
    state.finish_batch();
    assert!(state.read(|s| s.has_failures()));

    state.start_batch(1);
    let snapshot = state.snapshot();
    assert!(snapshot.failed_files.is_empty());
    assert_eq!(snapshot.progress, 0);
    assert!(snapshot.is_processing);
}
